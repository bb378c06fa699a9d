use std::sync::atomic::{AtomicU32, Ordering};

use chrono::Utc;
use notify_rust::Notification;
use tracing::debug;

use super::error::NotifyError;

/// Shows a reminder to the user.
pub trait NotificationPresenter: Send + Sync {
    /// Display a notification and return the id it was shown under.
    fn show(&self, title: &str, message: &str) -> Result<u32, NotifyError>;
}

/// Desktop notifications through notify-rust.
///
/// Every firing gets its own notification id, so repeats of one reminder
/// stack up instead of replacing each other.
pub struct DesktopNotifier {
    app_name: String,
    /// Run when the user clicks the notification body (Linux only).
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    open_command: Option<Vec<String>>,
    last_id: AtomicU32,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>, open_command: Option<Vec<String>>) -> Self {
        Self {
            app_name: app_name.into(),
            open_command: open_command.filter(|cmd| !cmd.is_empty()),
            last_id: AtomicU32::new(0),
        }
    }

    /// Id taken from the wall clock, bumped past the previous one when two
    /// firings land in the same millisecond.
    fn next_id(&self) -> u32 {
        let now = Utc::now().timestamp_millis() as u32;
        let previous = self
            .last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(if now > last { now } else { last.wrapping_add(1) })
            })
            .unwrap_or(now);
        if now > previous {
            now
        } else {
            previous.wrapping_add(1)
        }
    }
}

impl NotificationPresenter for DesktopNotifier {
    fn show(&self, title: &str, message: &str) -> Result<u32, NotifyError> {
        let id = self.next_id();

        let mut notification = Notification::new();
        notification.summary(title).body(message).appname(&self.app_name);

        #[cfg(target_os = "linux")]
        {
            notification
                .id(id)
                .urgency(notify_rust::Urgency::Critical)
                .action("default", "Open");

            match self.open_command.clone() {
                // Waiting for the click blocks, so the whole exchange lives on its own thread.
                Some(command) => {
                    let notification = notification.clone();
                    std::thread::spawn(move || match notification.show() {
                        Ok(handle) => handle.wait_for_action(|action| {
                            if action == "default" {
                                launch(&command);
                            }
                        }),
                        Err(e) => tracing::warn!("Failed to show notification: {}", e),
                    });
                }
                None => {
                    notification.show()?;
                }
            }
        }

        #[cfg(not(target_os = "linux"))]
        {
            notification.show()?;
        }

        debug!("Notification {} sent: {} - {}", id, title, message);
        Ok(id)
    }
}

#[cfg(target_os = "linux")]
fn launch(command: &[String]) {
    let Some((program, args)) = command.split_first() else {
        return;
    };
    match std::process::Command::new(program).args(args).spawn() {
        Ok(_) => debug!("Launched {} from notification", program),
        Err(e) => tracing::warn!("Failed to launch {}: {}", program, e),
    }
}
