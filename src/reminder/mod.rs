pub mod error;
pub mod model;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use model::{NewReminder, Reminder, RepeatMode, CATEGORIES, DEFAULT_CATEGORY};
pub use store::Store;
