//! Timed delivery of reminders: the scheduler decides what kind of alarm a
//! reminder needs, the service keeps the timers, and the receiver turns a
//! fired alarm into a desktop notification.

pub mod error;
pub mod notification;
pub mod permission;
pub mod receiver;
pub mod scheduler;
pub mod service;

#[cfg(test)]
pub mod testing;

pub use error::{AlarmError, ScheduleError};
pub use notification::{DesktopNotifier, NotificationPresenter};
pub use permission::{AlwaysGranted, ExactAlarmAccess, PermissionFile};
pub use receiver::{AlarmPayload, AlarmReceiver};
pub use scheduler::ReminderScheduler;
pub use service::{AlarmService, TokioAlarmService};
