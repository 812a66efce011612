mod app;
mod ui;

pub use app::Settings;

use anyhow::Result;
use app::App;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::time::Duration;

/// Run the interactive search box until the user quits
pub fn run(settings: Settings, initial_query: Option<String>) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Table loads in background; the query runs once it arrives
    let mut app = App::new(settings);
    if let Some(query) = initial_query {
        app.set_query(&query);
    }

    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.poll_load();

        terminal.draw(|f| ui::draw(f, app))?;

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        // Only handle key press events, not release or repeat
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        // Global keybindings
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c'))
            | (KeyModifiers::CONTROL, KeyCode::Char('q')) => return Ok(()),
            (_, KeyCode::F(5)) => {
                app.reload();
                continue;
            }
            _ => {}
        }

        match app.mode {
            // Any key closes help
            app::Mode::Help => app.hide_help(),
            app::Mode::Search => match (key.modifiers, key.code) {
                (KeyModifiers::CONTROL, KeyCode::Char('j'))
                | (KeyModifiers::CONTROL, KeyCode::Char('n')) => app.select_next(),
                (KeyModifiers::CONTROL, KeyCode::Char('k'))
                | (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.select_prev(),
                (KeyModifiers::CONTROL, KeyCode::Char('d')) => app.select_page_down(),
                (KeyModifiers::CONTROL, KeyCode::Char('u')) => app.select_page_up(),
                (KeyModifiers::CONTROL, KeyCode::Char('w')) => app.delete_word(),
                (KeyModifiers::CONTROL, KeyCode::Char('h')) => app.pop_char(),
                (KeyModifiers::CONTROL, KeyCode::Char('a')) => app.select_first(),
                (KeyModifiers::CONTROL, KeyCode::Char('e')) => app.select_last(),
                (KeyModifiers::CONTROL, KeyCode::Char('l')) => app.toggle_literal(),
                (KeyModifiers::NONE | KeyModifiers::SHIFT, code) => match code {
                    KeyCode::Esc => {
                        if app.query.is_empty() {
                            return Ok(());
                        }
                        app.clear_query();
                    }
                    KeyCode::Enter => app.open_selected(),
                    KeyCode::Tab | KeyCode::Right => app.toggle_detail(),
                    KeyCode::Down => app.select_next(),
                    KeyCode::Up => app.select_prev(),
                    KeyCode::PageDown => app.select_page_down(),
                    KeyCode::PageUp => app.select_page_up(),
                    KeyCode::Char('?') | KeyCode::F(1) => app.show_help(),
                    KeyCode::Char(c) => app.push_char(c),
                    KeyCode::Backspace => app.pop_char(),
                    _ => {}
                },
                _ => {}
            },
            app::Mode::Detail => {
                // Handle pending 'g' key for gg command
                if app.pending_key == Some('g') {
                    app.clear_pending_key();
                    if key.code == KeyCode::Char('g') {
                        app.select_first();
                        continue;
                    }
                }

                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Tab | KeyCode::Left => {
                        app.toggle_detail()
                    }
                    KeyCode::Down | KeyCode::Char('j') => app.location_next(),
                    KeyCode::Up | KeyCode::Char('k') => app.location_prev(),
                    KeyCode::Enter | KeyCode::Char('o') => app.open_selected(),
                    KeyCode::Char('n') => app.select_next(),
                    KeyCode::Char('N') | KeyCode::Char('p') => app.select_prev(),
                    KeyCode::Char('g') => app.pending_key = Some('g'),
                    KeyCode::Char('G') => app.select_last(),
                    KeyCode::Char('?') | KeyCode::F(1) => app.show_help(),
                    _ => {}
                }
            }
        }
    }
}
