use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Local, TimeZone};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// One day, the base unit of every repeating interval.
pub const INTERVAL_DAY: Duration = Duration::from_millis(86_400_000);

pub const DEFAULT_CATEGORY: &str = "Personal";

/// Categories offered by the form and the list filter.
pub const CATEGORIES: [&str; 5] = ["Personal", "Work", "Health", "Finance", "Others"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RepeatMode {
    #[default]
    Once,
    Daily,
    Weekly,
    Monthly,
}

impl RepeatMode {
    #[cfg(test)]
    pub const ALL: [RepeatMode; 4] = [
        RepeatMode::Once,
        RepeatMode::Daily,
        RepeatMode::Weekly,
        RepeatMode::Monthly,
    ];

    /// Name used in the database column.
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Once => "ONCE",
            RepeatMode::Daily => "DAILY",
            RepeatMode::Weekly => "WEEKLY",
            RepeatMode::Monthly => "MONTHLY",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RepeatMode::Once => "Once",
            RepeatMode::Daily => "Daily",
            RepeatMode::Weekly => "Weekly",
            RepeatMode::Monthly => "Monthly",
        }
    }

    /// Period between firings, `None` for one-shot reminders.
    ///
    /// Monthly is a flat 30 days and does not follow calendar months.
    pub fn interval(&self) -> Option<Duration> {
        match self {
            RepeatMode::Once => None,
            RepeatMode::Daily => Some(INTERVAL_DAY),
            RepeatMode::Weekly => Some(INTERVAL_DAY * 7),
            RepeatMode::Monthly => Some(INTERVAL_DAY * 30),
        }
    }

    pub fn is_repeating(&self) -> bool {
        self.interval().is_some()
    }

    pub fn next(&self) -> Self {
        match self {
            RepeatMode::Once => RepeatMode::Daily,
            RepeatMode::Daily => RepeatMode::Weekly,
            RepeatMode::Weekly => RepeatMode::Monthly,
            RepeatMode::Monthly => RepeatMode::Once,
        }
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown repeat mode: {0}")]
pub struct ParseRepeatModeError(String);

impl FromStr for RepeatMode {
    type Err = ParseRepeatModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ONCE" => Ok(RepeatMode::Once),
            "DAILY" => Ok(RepeatMode::Daily),
            "WEEKLY" => Ok(RepeatMode::Weekly),
            "MONTHLY" => Ok(RepeatMode::Monthly),
            _ => Err(ParseRepeatModeError(s.to_string())),
        }
    }
}

impl ToSql for RepeatMode {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RepeatMode {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: ParseRepeatModeError| FromSqlError::Other(Box::new(e)))
    }
}

/// A stored reminder. `id == 0` means the row has not been inserted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub id: i64,
    pub title: String,
    pub description: String,
    /// Epoch milliseconds of the first (or only) firing.
    pub start_time: i64,
    /// Epoch milliseconds. Shown to the user, never used to stop repeats.
    pub end_time: Option<i64>,
    pub repeat_mode: RepeatMode,
    pub category: String,
}

impl Reminder {
    pub fn from_new(id: i64, new: NewReminder) -> Self {
        Self {
            id,
            title: new.title,
            description: new.description,
            start_time: new.start_time,
            end_time: new.end_time,
            repeat_mode: new.repeat_mode,
            category: new.category,
        }
    }

    pub fn start_local(&self) -> Option<DateTime<Local>> {
        millis_to_local(self.start_time)
    }

    pub fn end_local(&self) -> Option<DateTime<Local>> {
        self.end_time.and_then(millis_to_local)
    }

    pub fn time_display(&self) -> String {
        let start = self
            .start_local()
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "--".to_string());
        match self.end_local() {
            Some(end) => format!("{} - {}", start, end.format("%Y-%m-%d %H:%M")),
            None => start,
        }
    }

    pub fn in_category(&self, category: &str) -> bool {
        self.category.eq_ignore_ascii_case(category)
    }
}

/// Field values for a reminder the store has not seen yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReminder {
    pub title: String,
    pub description: String,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub repeat_mode: RepeatMode,
    pub category: String,
}

impl NewReminder {
    pub fn new(title: impl Into<String>, start_time: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            start_time,
            end_time: None,
            repeat_mode: RepeatMode::Once,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn repeat(mut self, mode: RepeatMode) -> Self {
        self.repeat_mode = mode;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

pub fn millis_to_local(ms: i64) -> Option<DateTime<Local>> {
    Local.timestamp_millis_opt(ms).single()
}
