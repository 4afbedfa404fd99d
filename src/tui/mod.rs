// TUI module - terminal frontend for the scan workflow
//
// Sets up the terminal, runs the event loop, and cleans up when done. The
// loop multiplexes keyboard input, timer ticks, orchestrator state snapshots,
// and out-of-band effects with tokio::select!. All workflow decisions happen
// in the orchestrator; keys only turn into commands.

pub mod app;
pub mod markdown;
pub mod theme;
pub mod ui;

use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc;

use crate::capture::RawFile;
use crate::logging::LogBuffer;
use crate::workflow::{Command, ScreenState, WorkflowHandles};
use app::App;
use theme::Theme;

/// Run the TUI against a running orchestrator until the user quits.
pub async fn run_tui(
    handles: &mut WorkflowHandles,
    log_buffer: LogBuffer,
    require_auth: bool,
    authenticated: bool,
) -> Result<()> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to setup terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("Failed to create terminal")?;

    let mut app = App::new(log_buffer, require_auth, authenticated);

    let result = run_event_loop(&mut terminal, &mut app, handles).await;

    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to restore terminal")?;
    terminal.show_cursor().context("Failed to show cursor")?;

    result
}

async fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    handles: &mut WorkflowHandles,
) -> Result<()> {
    let theme = Theme::default();
    // Spinner cadence; drawing happens once per loop pass anyway.
    let mut tick_interval = tokio::time::interval(Duration::from_millis(120));

    loop {
        terminal
            .draw(|f| ui::draw(f, app, &theme))
            .context("Failed to draw terminal")?;

        tokio::select! {
            _ = async {
                if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                    if let Ok(Event::Key(key_event)) = event::read() {
                        handle_key_event(app, key_event, &handles.commands);
                    }
                }
            } => {}

            _ = tick_interval.tick() => {
                app.tick();
            }

            changed = handles.states.changed() => {
                if changed.is_ok() {
                    let state = handles.states.borrow_and_update().clone();
                    app.on_state(state);
                }
            }

            Some(effect) = handles.effects.recv() => {
                app.on_effect(effect);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key_event(app: &mut App, key_event: KeyEvent, commands: &mpsc::Sender<Command>) {
    if key_event.kind != KeyEventKind::Press {
        return;
    }

    // Ctrl+C / Ctrl+Q quit from any state, including while typing a path.
    if key_event.modifiers.contains(KeyModifiers::CONTROL)
        && matches!(key_event.code, KeyCode::Char('c') | KeyCode::Char('q'))
    {
        app.should_quit = true;
        return;
    }

    match app.screen {
        ScreenState::Idle => handle_idle_key(app, key_event, commands),
        ScreenState::Previewing(_) => match key_event.code {
            KeyCode::Enter | KeyCode::Char('s') => send(app, commands, Command::Submit),
            KeyCode::Esc | KeyCode::Char('d') => send(app, commands, Command::Discard),
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        },
        ScreenState::Submitting(_) => match key_event.code {
            KeyCode::Esc => send(app, commands, Command::Discard),
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        },
        ScreenState::Reported(_, _) => match key_event.code {
            KeyCode::Esc | KeyCode::Char('d') => send(app, commands, Command::Discard),
            KeyCode::Up => app.scroll_up(1),
            KeyCode::Down => app.scroll_down(1),
            KeyCode::PageUp => app.scroll_up(10),
            KeyCode::PageDown => app.scroll_down(10),
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        },
        ScreenState::Failed(_, _) => match key_event.code {
            KeyCode::Enter | KeyCode::Char('r') => send(app, commands, Command::Submit),
            KeyCode::Esc | KeyCode::Char('d') => send(app, commands, Command::Discard),
            KeyCode::Char('q') => app.should_quit = true,
            _ => {}
        },
    }
}

/// Idle is the only state with free-text input: the user types an image path.
fn handle_idle_key(app: &mut App, key_event: KeyEvent, commands: &mpsc::Sender<Command>) {
    match key_event.code {
        KeyCode::Enter => {
            let path = app.input.trim().to_string();
            if path.is_empty() {
                return;
            }
            match RawFile::read(Path::new(&path)) {
                Ok(raw) => send(app, commands, Command::Select(raw)),
                Err(e) => {
                    tracing::warn!(%path, error = %e, "could not read candidate file");
                    app.status = Some(format!("Cannot read {path}: {e}"));
                }
            }
        }
        KeyCode::Esc => {
            app.input.clear();
            app.status = None;
        }
        KeyCode::Backspace => {
            app.input.pop();
        }
        KeyCode::Char(c) => {
            app.input.push(c);
        }
        _ => {}
    }
}

fn send(app: &mut App, commands: &mpsc::Sender<Command>, command: Command) {
    if commands.try_send(command).is_err() {
        tracing::warn!("command dropped: orchestrator queue full or gone");
        app.status = Some("Busy, try again".to_string());
    }
}
