#[derive(Debug, thiserror::Error)]
pub enum AlarmError {
    /// Timers need a tokio runtime to live on.
    #[error("No async runtime available for alarm timers")]
    NoRuntime,

    /// A repeating alarm was requested with a zero period.
    #[error("Repeating alarm {0} has a zero interval")]
    ZeroInterval(i64),
}

/// Why a reminder could not be scheduled. The `Display` text is shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    /// One-shot reminders need the precise-timing capability.
    #[error("Exact alarm permission needed. Please grant it in settings.")]
    ExactAlarmPermission,

    #[error("Error setting alarm.")]
    Alarm(#[from] AlarmError),
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to show notification: {0}")]
    Show(#[from] notify_rust::error::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Failed to write permission settings {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to encode permission settings: {0}")]
    Encode(#[from] toml::ser::Error),
}
