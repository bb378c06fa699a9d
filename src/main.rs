mod alarm;
mod app;
mod components;
mod config;
mod event;
mod logging;
mod reminder;
mod theme;
mod tui;
mod view_model;

use std::time::Duration;

use app::{App, InputMode};
use color_eyre::Result;
use config::Config;
use crossterm::event::{KeyCode, KeyModifiers};
use event::Input;
use ratatui::layout::{Constraint, Layout, Rect};
use tracing::info;

fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::load()?;
    logging::init(&config)?;

    // Alarms and the view-model live on the runtime; the UI loop stays on
    // this thread.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .build()?;
    let _guard = runtime.enter();

    let mut app = App::new(&config)?;
    info!("Reminders ready, launching TUI");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &mut app);
    tui::restore()?;
    result
}

fn run(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    while app.running {
        app.tick();

        terminal.draw(|frame| {
            let area = frame.area();

            let layout = Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

            app.filter.render(frame, layout[0]);

            let visible = app.visible();
            let refs: Vec<_> = visible.iter().collect();
            components::ReminderList::render(
                frame,
                layout[1],
                &refs,
                app.selected,
                app.filter.label(),
            );

            if let Some(ref form) = app.form_state {
                components::ReminderForm::render(frame, area, form);
            }

            if app.input_mode == InputMode::Prompt {
                let path = app.settings_path();
                components::PermissionPrompt::render(frame, area, path.as_deref());
            }

            if app.show_help {
                render_help(frame, area);
            }

            components::StatusBar::render(
                frame,
                layout[2],
                app.input_mode,
                app.status_message.as_deref(),
            );
        })?;

        let key = match event::next_input(Duration::from_millis(100))? {
            Input::Key(key) => key,
            Input::Tick => continue,
        };

        app.status_message = None;

        if app.show_help {
            if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
                app.show_help = false;
            }
            continue;
        }

        match app.input_mode {
            InputMode::Normal => handle_normal_input(app, key.code, key.modifiers),
            InputMode::Form => handle_form_input(app, key.code),
            InputMode::Prompt => handle_prompt_input(app, key.code),
        }
    }

    Ok(())
}

fn handle_normal_input(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.running = false;
        }
        (KeyCode::Down, _) | (KeyCode::Char('j'), _) => app.select_next(),
        (KeyCode::Up, _) | (KeyCode::Char('k'), _) => app.select_prev(),
        (KeyCode::Tab, _) | (KeyCode::Char('f'), _) => app.next_filter(),
        (KeyCode::BackTab, _) => app.prev_filter(),
        (KeyCode::Char('n'), _) => app.open_new_form(),
        (KeyCode::Char('e'), _) | (KeyCode::Enter, _) => app.open_edit_form(),
        (KeyCode::Char('d'), _) => app.delete_selected(),
        (KeyCode::Char('?'), _) => app.show_help = true,
        _ => {}
    }
}

fn handle_form_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.close_form(),
        KeyCode::Enter => app.submit_form(),
        KeyCode::Tab => app.form_tab(),
        KeyCode::BackTab => app.form_backtab(),
        KeyCode::Backspace => app.form_backspace(),
        KeyCode::Char(c) => app.form_input_char(c),
        _ => {}
    }
}

fn handle_prompt_input(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('g') => app.grant_permission(),
        KeyCode::Char('l') | KeyCode::Esc => app.defer_permission(),
        _ => {}
    }
}

fn render_help(frame: &mut ratatui::Frame, area: Rect) {
    use ratatui::style::{Color, Modifier, Style};
    use ratatui::text::{Line, Span};
    use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

    let popup_w = area.width.min(52).max(30);
    let popup_h = area.height.min(20).max(12);
    let x = area.x + (area.width.saturating_sub(popup_w)) / 2;
    let y = area.y + (area.height.saturating_sub(popup_h)) / 2;
    let popup_area = Rect::new(x, y, popup_w, popup_h);

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(" Keybindings ")
        .title_style(theme::ACCENT_STYLE.add_modifier(Modifier::BOLD))
        .borders(Borders::ALL)
        .border_style(theme::ACCENT_STYLE);

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let key_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let section_style = Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let entry = |keys: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", keys), key_style),
            Span::raw(desc),
        ])
    };

    let lines = vec![
        Line::from(Span::styled("List", section_style)),
        entry("j/k", "Move selection"),
        entry("Tab/f", "Next category filter"),
        entry("S-Tab", "Previous category filter"),
        Line::from(""),
        Line::from(Span::styled("Reminders", section_style)),
        entry("n", "New reminder"),
        entry("e/Enter", "Edit selected reminder"),
        entry("d", "Delete selected reminder"),
        Line::from(""),
        Line::from(Span::styled("Form", section_style)),
        entry("Tab", "Next field"),
        entry("Space", "Change toggle field"),
        entry("Enter", "Save"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  q", key_style),
            Span::styled(" / ", theme::DIM_STYLE),
            Span::styled("Esc     ", key_style),
            Span::raw("Quit / close popup"),
        ]),
    ];

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}
