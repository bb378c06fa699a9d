use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::reminder::Reminder;
use crate::theme;

pub struct ReminderList;

impl ReminderList {
    pub fn render(
        frame: &mut Frame,
        area: Rect,
        reminders: &[&Reminder],
        selected_index: usize,
        filter: &str,
    ) {
        let w = area.width as usize;
        let theme = theme::current();

        let title = if w >= 30 {
            format!(" Reminders: {} ({}) ", filter, reminders.len())
        } else {
            " Reminders ".to_string()
        };

        let block = Block::default()
            .title(title)
            .title_style(theme.header)
            .borders(Borders::ALL)
            .border_style(theme.border);

        if reminders.is_empty() {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            let msg = if filter == "All" {
                "No reminders yet. Press 'n' to add one.".to_string()
            } else {
                format!("No {} reminders.", filter)
            };
            frame.render_widget(Paragraph::new(msg).style(theme.dim), inner);
            return;
        }

        let inner_w = area.width.saturating_sub(2) as usize;

        let items: Vec<ListItem> = reminders
            .iter()
            .map(|reminder| {
                let tag = format!(" {} ", reminder.category);
                let repeat = if reminder.repeat_mode.is_repeating() {
                    format!(" \u{21bb} {}", reminder.repeat_mode)
                } else {
                    String::new()
                };
                let title_w = inner_w.saturating_sub(tag.len() + repeat.chars().count() + 2);

                let first = Line::from(vec![
                    Span::styled(
                        format!(" {} ", truncate(&reminder.title, title_w)),
                        Style::default().add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(tag, theme::category_style(&reminder.category)),
                    Span::styled(repeat, theme.dim),
                ]);

                let mut detail = vec![Span::styled(
                    format!("   {}", reminder.time_display()),
                    theme.dim,
                )];
                if !reminder.description.is_empty() {
                    let used = detail[0].width() + 2;
                    detail.push(Span::raw(format!(
                        "  {}",
                        truncate(&reminder.description, inner_w.saturating_sub(used))
                    )));
                }

                ListItem::new(vec![first, Line::from(detail)])
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(theme.highlight);
        let mut state = ListState::default().with_selected(Some(selected_index));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max {
        s.to_string()
    } else if max > 3 {
        let head: String = s.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        s.chars().take(max).collect()
    }
}
