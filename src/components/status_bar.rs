use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::InputMode;
use crate::theme;

pub struct StatusBar;

impl StatusBar {
    pub fn render(frame: &mut Frame, area: Rect, mode: InputMode, message: Option<&str>) {
        let w = area.width as usize;
        let style = theme::current().status;

        let mode_str = match mode {
            InputMode::Normal => "[List]",
            InputMode::Form => "[Form]",
            InputMode::Prompt => "[Permission]",
        };

        // Show status message if present, otherwise show context-aware hints
        let right_text = if let Some(msg) = message {
            format!(" {} ", msg)
        } else {
            match mode {
                InputMode::Normal if w >= 80 => {
                    " jk:Move Tab:Filter n:New e:Edit d:Delete ?:Help q:Quit ".to_string()
                }
                InputMode::Normal if w >= 45 => " n:New e:Edit d:Del q:Quit ".to_string(),
                InputMode::Form => " Enter:Save Esc:Cancel ".to_string(),
                InputMode::Prompt => " g:Grant l:Later ".to_string(),
                _ => " ?:Help q:Quit ".to_string(),
            }
        };

        let left = format!(" {} ", mode_str);
        let padding = " ".repeat(w.saturating_sub(left.len() + right_text.chars().count()));

        let line = Line::from(vec![
            Span::styled(left, style),
            Span::styled(padding, style),
            Span::styled(right_text, style),
        ]);

        frame.render_widget(Paragraph::new(line).style(style), area);
    }
}
