use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::reminder::{Reminder, CATEGORIES};
use crate::theme;

pub const ALL: &str = "All";

/// Which category the list is narrowed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryFilter {
    /// 0 is "All", then one slot per entry of `CATEGORIES`.
    index: usize,
}

impl CategoryFilter {
    pub fn label(&self) -> &'static str {
        match self.index {
            0 => ALL,
            i => CATEGORIES[i - 1],
        }
    }

    pub fn next(&mut self) {
        self.index = (self.index + 1) % (CATEGORIES.len() + 1);
    }

    pub fn prev(&mut self) {
        self.index = (self.index + CATEGORIES.len()) % (CATEGORIES.len() + 1);
    }

    pub fn matches(&self, reminder: &Reminder) -> bool {
        self.index == 0 || reminder.in_category(self.label())
    }

    pub fn apply<'a>(&self, reminders: &'a [Reminder]) -> Vec<&'a Reminder> {
        reminders.iter().filter(|r| self.matches(r)).collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let theme = theme::current();
        let mut spans = vec![Span::raw(" ")];
        for (i, label) in std::iter::once(ALL).chain(CATEGORIES).enumerate() {
            let style = if i == self.index {
                theme.tab
            } else {
                theme.dim
            };
            spans.push(Span::styled(format!(" {} ", label), style));
            spans.push(Span::raw(" "));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}
