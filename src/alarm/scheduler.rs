use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::error::ScheduleError;
use super::permission::ExactAlarmAccess;
use super::receiver::AlarmPayload;
use super::service::AlarmService;
use crate::reminder::Reminder;

/// Turns reminders into alarms.
///
/// One-shot reminders become exact alarms and need the precise-timing
/// capability; repeating reminders become periodic alarms and do not.
#[derive(Clone)]
pub struct ReminderScheduler {
    alarms: Arc<dyn AlarmService>,
    access: Arc<dyn ExactAlarmAccess>,
}

impl ReminderScheduler {
    pub fn new(alarms: Arc<dyn AlarmService>, access: Arc<dyn ExactAlarmAccess>) -> Self {
        Self { alarms, access }
    }

    pub fn can_schedule_exact(&self) -> bool {
        self.access.can_schedule_exact()
    }

    pub fn schedule(&self, reminder: &Reminder) -> Result<(), ScheduleError> {
        debug!(
            "Scheduling reminder {} ({})",
            reminder.id,
            reminder.repeat_mode.as_str()
        );
        let payload = AlarmPayload::for_reminder(reminder).encode();

        let result = match reminder.repeat_mode.interval() {
            None => {
                if !self.access.can_schedule_exact() {
                    warn!(
                        "Exact alarm permission not granted, reminder {} left unscheduled",
                        reminder.id
                    );
                    return Err(ScheduleError::ExactAlarmPermission);
                }
                self.alarms
                    .set_exact(reminder.id, reminder.start_time, payload)
            }
            Some(interval) => {
                self.alarms
                    .set_repeating(reminder.id, reminder.start_time, interval, payload)
            }
        };

        match result {
            Ok(()) => {
                info!("Reminder {} scheduled", reminder.id);
                Ok(())
            }
            Err(e) => {
                error!("Failed to set alarm for reminder {}: {}", reminder.id, e);
                Err(ScheduleError::Alarm(e))
            }
        }
    }

    /// Cancel the alarm for `reminder.id`. Cancelling nothing is fine.
    pub fn cancel(&self, reminder: &Reminder) {
        if self.alarms.cancel(reminder.id) {
            info!("Alarm cancelled for reminder {}", reminder.id);
        } else {
            warn!(
                "No alarm registered for reminder {}, nothing to cancel",
                reminder.id
            );
        }
    }

    #[cfg(test)]
    pub fn is_scheduled(&self, reminder: &Reminder) -> bool {
        self.alarms.is_scheduled(reminder.id)
    }
}
