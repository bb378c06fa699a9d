pub mod category_filter;
pub mod permission_prompt;
pub mod reminder_form;
pub mod reminder_list;
pub mod status_bar;

pub use category_filter::CategoryFilter;
pub use permission_prompt::PermissionPrompt;
pub use reminder_form::{ReminderForm, ReminderFormState};
pub use reminder_list::ReminderList;
pub use status_bar::StatusBar;
