use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::theme;

/// Asks the user to allow precise-timing alarms.
pub struct PermissionPrompt;

impl PermissionPrompt {
    pub fn render(frame: &mut Frame, area: Rect, settings_path: Option<&str>) {
        let popup_w = area.width.min(60).max(30);
        let popup_h = area.height.min(12).max(8);
        let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
        let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
        let popup_area = Rect::new(x, y, popup_w, popup_h);

        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(" Permission Required for Precise Reminders ")
            .title_style(theme::ACCENT_STYLE.add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(theme::ACCENT_STYLE);

        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let key_style = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = vec![
            Line::from(
                "To make one-time reminders fire exactly on time, this app needs \
                 permission to schedule exact alarms.",
            ),
            Line::from(""),
        ];
        if let Some(path) = settings_path {
            lines.push(Line::from(Span::styled(
                format!("Stored in {}", path),
                theme::current().dim,
            )));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(vec![
            Span::styled("  g ", key_style),
            Span::raw("Grant in settings"),
        ]));
        lines.push(Line::from(vec![
            Span::styled("  l ", key_style),
            Span::raw("Later"),
        ]));

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);
    }
}
