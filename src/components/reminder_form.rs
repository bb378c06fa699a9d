use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::reminder::{NewReminder, Reminder, RepeatMode, CATEGORIES};
use crate::theme;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormField {
    Title,
    Description,
    Date,
    StartTime,
    HasEnd,
    EndDate,
    EndTime,
    Repeat,
    Category,
}

impl FormField {
    pub fn next(&self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Date,
            FormField::Date => FormField::StartTime,
            FormField::StartTime => FormField::HasEnd,
            FormField::HasEnd => FormField::EndDate,
            FormField::EndDate => FormField::EndTime,
            FormField::EndTime => FormField::Repeat,
            FormField::Repeat => FormField::Category,
            FormField::Category => FormField::Title,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            FormField::Title => FormField::Category,
            FormField::Description => FormField::Title,
            FormField::Date => FormField::Description,
            FormField::StartTime => FormField::Date,
            FormField::HasEnd => FormField::StartTime,
            FormField::EndDate => FormField::HasEnd,
            FormField::EndTime => FormField::EndDate,
            FormField::Repeat => FormField::EndTime,
            FormField::Category => FormField::Repeat,
        }
    }

    /// Fields changed with Space rather than typed into.
    pub fn is_toggle(&self) -> bool {
        matches!(
            self,
            FormField::HasEnd | FormField::Repeat | FormField::Category
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    #[error("Title cannot be empty")]
    BlankTitle,
    #[error("{0} date must be YYYY-MM-DD")]
    InvalidDate(&'static str),
    #[error("{0} time must be HH:MM")]
    InvalidTime(&'static str),
    #[error("End time must be after start time")]
    EndNotAfterStart,
}

#[derive(Debug, Clone)]
pub struct ReminderFormState {
    /// Set when editing an existing reminder.
    pub editing: Option<Reminder>,
    pub title: String,
    pub description: String,
    pub date: String,
    pub start_time: String,
    pub has_end: bool,
    pub end_date: String,
    pub end_time: String,
    pub repeat_mode: RepeatMode,
    pub category_index: usize,
    pub active_field: FormField,
    pub error: Option<String>,
}

impl ReminderFormState {
    /// Blank form starting at the next full hour.
    pub fn new(now: DateTime<Local>) -> Self {
        let start = next_full_hour(now);
        let end = start + chrono::Duration::hours(1);
        Self {
            editing: None,
            title: String::new(),
            description: String::new(),
            date: start.format(DATE_FORMAT).to_string(),
            start_time: start.format(TIME_FORMAT).to_string(),
            has_end: false,
            end_date: end.format(DATE_FORMAT).to_string(),
            end_time: end.format(TIME_FORMAT).to_string(),
            repeat_mode: RepeatMode::Once,
            category_index: 0,
            active_field: FormField::Title,
            error: None,
        }
    }

    pub fn edit(reminder: &Reminder, now: DateTime<Local>) -> Self {
        let mut form = Self::new(now);
        if let Some(start) = reminder.start_local() {
            form.date = start.format(DATE_FORMAT).to_string();
            form.start_time = start.format(TIME_FORMAT).to_string();
        }
        if let Some(end) = reminder.end_local() {
            form.has_end = true;
            form.end_date = end.format(DATE_FORMAT).to_string();
            form.end_time = end.format(TIME_FORMAT).to_string();
        }
        form.title = reminder.title.clone();
        form.description = reminder.description.clone();
        form.repeat_mode = reminder.repeat_mode;
        form.category_index = CATEGORIES
            .iter()
            .position(|c| reminder.in_category(c))
            .unwrap_or(CATEGORIES.len() - 1);
        form.editing = Some(reminder.clone());
        form
    }

    pub fn category(&self) -> &'static str {
        CATEGORIES[self.category_index % CATEGORIES.len()]
    }

    pub fn input_char(&mut self, c: char) {
        self.error = None;
        match self.active_field {
            FormField::Title => self.title.push(c),
            FormField::Description => self.description.push(c),
            FormField::Date => self.date.push(c),
            FormField::StartTime => self.start_time.push(c),
            FormField::EndDate => self.end_date.push(c),
            FormField::EndTime => self.end_time.push(c),
            FormField::HasEnd | FormField::Repeat | FormField::Category => {}
        }
    }

    pub fn backspace(&mut self) {
        self.error = None;
        match self.active_field {
            FormField::Title => { self.title.pop(); }
            FormField::Description => { self.description.pop(); }
            FormField::Date => { self.date.pop(); }
            FormField::StartTime => { self.start_time.pop(); }
            FormField::EndDate => { self.end_date.pop(); }
            FormField::EndTime => { self.end_time.pop(); }
            FormField::HasEnd | FormField::Repeat | FormField::Category => {}
        }
    }

    /// Space on a toggle field.
    pub fn toggle(&mut self) {
        self.error = None;
        match self.active_field {
            FormField::HasEnd => self.has_end = !self.has_end,
            FormField::Repeat => self.repeat_mode = self.repeat_mode.next(),
            FormField::Category => {
                self.category_index = (self.category_index + 1) % CATEGORIES.len();
            }
            _ => {}
        }
    }

    /// Check the input and build the reminder it describes.
    pub fn validate(&self) -> Result<NewReminder, FormError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(FormError::BlankTitle);
        }

        let start = parse_local(&self.date, &self.start_time, "Start")?;
        let end = if self.has_end {
            let end = parse_local(&self.end_date, &self.end_time, "End")?;
            if end <= start {
                return Err(FormError::EndNotAfterStart);
            }
            Some(end)
        } else {
            None
        };

        Ok(NewReminder {
            title: title.to_string(),
            description: self.description.trim().to_string(),
            start_time: start,
            end_time: end,
            repeat_mode: self.repeat_mode,
            category: self.category().to_string(),
        })
    }
}

fn next_full_hour(now: DateTime<Local>) -> DateTime<Local> {
    let next = now + chrono::Duration::hours(1);
    next.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(next)
}

/// Local date + time strings to epoch milliseconds.
fn parse_local(date: &str, time: &str, which: &'static str) -> Result<i64, FormError> {
    let date = NaiveDate::parse_from_str(date.trim(), DATE_FORMAT)
        .map_err(|_| FormError::InvalidDate(which))?;
    let time = NaiveTime::parse_from_str(time.trim(), TIME_FORMAT)
        .map_err(|_| FormError::InvalidTime(which))?;
    Local
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .earliest()
        .map(|dt| dt.timestamp_millis())
        .ok_or(FormError::InvalidTime(which))
}

pub struct ReminderForm;

impl ReminderForm {
    pub fn render(frame: &mut Frame, area: Rect, state: &ReminderFormState) {
        // Center the form popup
        let form_w = area.width.min(56).max(30);
        let form_h = area.height.min(16).max(12);
        let x = area.x + (area.width.saturating_sub(form_w)) / 2;
        let y = area.y + (area.height.saturating_sub(form_h)) / 2;
        let form_area = Rect::new(x, y, form_w, form_h);

        frame.render_widget(Clear, form_area);

        let title = if state.editing.is_some() {
            " Edit Reminder "
        } else {
            " Add Reminder "
        };
        let block = Block::default()
            .title(title)
            .title_style(theme::ACCENT_STYLE.add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(theme::ACCENT_STYLE);

        let inner = block.inner(form_area);
        frame.render_widget(block, form_area);

        let rows = Layout::vertical([
            Constraint::Length(1), // title
            Constraint::Length(1), // description
            Constraint::Length(1), // date
            Constraint::Length(1), // start
            Constraint::Length(1), // end toggle
            Constraint::Length(1), // end date
            Constraint::Length(1), // end time
            Constraint::Length(1), // repeat
            Constraint::Length(1), // category
            Constraint::Length(1), // error
            Constraint::Length(1), // help
            Constraint::Min(0),
        ])
        .split(inner);

        let active = state.active_field;
        render_field(frame, rows[0], "Title:", &state.title, active == FormField::Title);
        render_field(frame, rows[1], "Notes:", &state.description, active == FormField::Description);
        render_field(frame, rows[2], "Date:", &state.date, active == FormField::Date);
        render_field(frame, rows[3], "Start:", &state.start_time, active == FormField::StartTime);

        let end_toggle = if state.has_end { "[x] End time" } else { "[ ] End time" };
        render_field(frame, rows[4], "", end_toggle, active == FormField::HasEnd);

        if state.has_end {
            render_field(frame, rows[5], "Until:", &state.end_date, active == FormField::EndDate);
            render_field(frame, rows[6], "End:", &state.end_time, active == FormField::EndTime);
        } else {
            render_field(frame, rows[5], "Until:", "----------", false);
            render_field(frame, rows[6], "End:", "--:--", false);
        }

        render_field(frame, rows[7], "Repeat:", state.repeat_mode.label(), active == FormField::Repeat);

        let category = Span::styled(
            format!(" {} ", state.category()),
            theme::category_style(state.category()),
        );
        let cursor = if active == FormField::Category { "_" } else { "" };
        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled(format!("{:<8}", "Cat:"), theme::current().dim),
                category,
                Span::raw(cursor),
            ])),
            rows[8],
        );

        if let Some(ref error) = state.error {
            frame.render_widget(
                Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
                rows[9],
            );
        }

        let help = Line::from(vec![
            Span::styled("Tab", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(":Next ", theme::current().dim),
            Span::styled("Space", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(":Toggle ", theme::current().dim),
            Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(":Save ", theme::current().dim),
            Span::styled("Esc", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(":Cancel", theme::current().dim),
        ]);
        frame.render_widget(Paragraph::new(help), rows[10]);
    }
}

fn render_field(frame: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    let label_w = if label.is_empty() { 0 } else { 8 };
    let cursor = if active { "_" } else { "" };

    let style = if active {
        theme::current().selected
    } else {
        Style::default()
    };

    let mut spans = Vec::new();
    if !label.is_empty() {
        spans.push(Span::styled(
            format!("{:<width$}", label, width = label_w),
            theme::current().dim,
        ));
    }
    spans.push(Span::styled(format!("{}{}", value, cursor), style));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 10, 14, 25, 0).unwrap()
    }

    fn filled() -> ReminderFormState {
        let mut form = ReminderFormState::new(now());
        form.title = "Team sync".to_string();
        form
    }

    #[test]
    fn test_new_form_starts_next_hour() {
        let form = ReminderFormState::new(now());
        assert_eq!(form.date, "2026-03-10");
        assert_eq!(form.start_time, "15:00");
        assert_eq!(form.end_time, "16:00");
        assert!(!form.has_end);
        assert_eq!(form.category(), "Personal");
    }

    #[test]
    fn test_blank_title_rejected() {
        let mut form = ReminderFormState::new(now());
        form.title = "   ".to_string();
        assert_eq!(form.validate(), Err(FormError::BlankTitle));
    }

    #[test]
    fn test_end_must_follow_start() {
        let mut form = filled();
        form.has_end = true;
        form.end_date = form.date.clone();
        form.end_time = form.start_time.clone();
        assert_eq!(form.validate(), Err(FormError::EndNotAfterStart));

        form.end_time = "14:00".to_string();
        assert_eq!(form.validate(), Err(FormError::EndNotAfterStart));

        form.end_time = "15:01".to_string();
        let new = form.validate().unwrap();
        assert_eq!(new.end_time.unwrap() - new.start_time, 60_000);
    }

    #[test]
    fn test_end_ignored_when_disabled() {
        let mut form = filled();
        form.end_time = "00:00".to_string();
        assert_eq!(form.validate().unwrap().end_time, None);
    }

    #[test]
    fn test_bad_date_and_time() {
        let mut form = filled();
        form.date = "10/03/2026".to_string();
        assert_eq!(form.validate(), Err(FormError::InvalidDate("Start")));

        let mut form = filled();
        form.start_time = "25:00".to_string();
        assert_eq!(form.validate(), Err(FormError::InvalidTime("Start")));
    }

    #[test]
    fn test_toggles() {
        let mut form = filled();
        form.active_field = FormField::Repeat;
        form.toggle();
        assert_eq!(form.repeat_mode, RepeatMode::Daily);

        form.active_field = FormField::Category;
        form.toggle();
        assert_eq!(form.category(), "Work");

        form.active_field = FormField::HasEnd;
        form.toggle();
        assert!(form.has_end);

        let new = form.validate().unwrap();
        assert_eq!(new.repeat_mode, RepeatMode::Daily);
        assert_eq!(new.category, "Work");
    }

    #[test]
    fn test_edit_prefills_every_field() {
        let mut original = filled();
        original.description = "weekly".to_string();
        original.repeat_mode = RepeatMode::Weekly;
        original.category_index = 2;
        original.has_end = true;
        let reminder = Reminder::from_new(5, original.validate().unwrap());

        let form = ReminderFormState::edit(&reminder, now());
        assert_eq!(form.editing.as_ref().map(|r| r.id), Some(5));
        let again = form.validate().unwrap();
        assert_eq!(Reminder::from_new(5, again), reminder);
    }

    #[test]
    fn test_field_cycle() {
        let mut field = FormField::Title;
        for _ in 0..9 {
            assert_eq!(field.next().prev(), field);
            field = field.next();
        }
        assert_eq!(field, FormField::Title);
    }
}
