use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::notification::NotificationPresenter;
use crate::reminder::Reminder;

pub const DEFAULT_TITLE: &str = "Reminder";
pub const DEFAULT_DESCRIPTION: &str = "Don't forget!";

/// What an alarm carries to the moment it fires.
///
/// It is encoded when the alarm is set and travels as opaque bytes, so edits
/// made afterwards only show up once the alarm is set again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlarmPayload {
    pub reminder_id: i64,
    pub title: String,
    pub description: String,
}

impl AlarmPayload {
    pub fn for_reminder(reminder: &Reminder) -> Self {
        Self {
            reminder_id: reminder.id,
            title: reminder.title.clone(),
            description: reminder.description.clone(),
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        // Serializing three plain fields into a Vec cannot fail.
        serde_json::to_vec(self).unwrap_or_default()
    }

    /// Decode a payload, defaulting every field that is missing or has the
    /// wrong type. Garbage yields an all-default payload.
    pub fn decode(bytes: &[u8]) -> Self {
        let value: Value = serde_json::from_slice(bytes).unwrap_or(Value::Null);
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            reminder_id: value
                .get("reminder_id")
                .and_then(Value::as_i64)
                .unwrap_or(-1),
            title: text("title").unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            description: text("description").unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
        }
    }
}

/// Called by the alarm service whenever an alarm goes off.
pub struct AlarmReceiver {
    presenter: Arc<dyn NotificationPresenter>,
}

impl AlarmReceiver {
    pub fn new(presenter: Arc<dyn NotificationPresenter>) -> Self {
        Self { presenter }
    }

    pub fn on_receive(&self, payload: &[u8]) {
        let payload = AlarmPayload::decode(payload);
        info!(
            "Alarm fired for reminder {}: '{}'",
            payload.reminder_id, payload.title
        );

        if let Err(e) = self.presenter.show(&payload.title, &payload.description) {
            warn!(
                "Could not show notification for reminder {}: {}",
                payload.reminder_id, e
            );
        }
    }
}
