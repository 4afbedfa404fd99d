// TUI application state
//
// Holds the latest screen snapshot from the orchestrator plus purely local
// display state (path input, scroll, spinner frame). All workflow decisions
// live in the orchestrator; this type only mirrors them for drawing.

use crate::logging::LogBuffer;
use crate::report::ReportView;
use crate::workflow::{Effect, ScreenState};

const SPINNER_FRAMES: [&str; 4] = ["⠋", "⠙", "⠸", "⠴"];

pub struct App {
    /// Latest snapshot published by the orchestrator.
    pub screen: ScreenState,

    /// Projection of `screen` for the report panel.
    pub report: ReportView,

    /// Path the user is typing while Idle.
    pub input: String,

    /// Transient message line (rejected candidate, login hint, read error).
    pub status: Option<String>,

    /// Captured log lines for the side panel.
    pub log_buffer: LogBuffer,

    /// Scroll offset for the report panel.
    pub report_scroll: u16,

    /// Whether a credential is currently stored.
    pub authenticated: bool,

    /// Whether the endpoint requires a credential.
    pub require_auth: bool,

    pub should_quit: bool,

    spinner_frame: usize,
}

impl App {
    pub fn new(log_buffer: LogBuffer, require_auth: bool, authenticated: bool) -> Self {
        Self {
            screen: ScreenState::Idle,
            report: ReportView::Hidden,
            input: String::new(),
            status: None,
            log_buffer,
            report_scroll: 0,
            authenticated,
            require_auth,
            should_quit: false,
            spinner_frame: 0,
        }
    }

    /// Apply a fresh snapshot. Local display state derived from the old
    /// snapshot (scroll, stale status line) is reset.
    pub fn on_state(&mut self, state: ScreenState) {
        self.report = ReportView::project(&state);
        self.report_scroll = 0;
        self.status = None;
        if matches!(state, ScreenState::Idle) {
            self.input.clear();
        }
        self.screen = state;
    }

    pub fn on_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RedirectToLogin => {
                self.authenticated = false;
                self.status =
                    Some("Login required - run `labelscan login`, then try again".to_string());
            }
            Effect::InvalidImage(message) => {
                self.status = Some(message);
            }
        }
    }

    pub fn tick(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAMES.len();
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame]
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.report_scroll = self.report_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.report_scroll = self.report_scroll.saturating_add(lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::AnalysisReport;
    use crate::capture::{CaptureController, RawFile};

    fn app() -> App {
        App::new(LogBuffer::new(), false, false)
    }

    fn previewing() -> ScreenState {
        let mut controller = CaptureController::new();
        let img = controller
            .select(RawFile {
                name: "label.png".to_string(),
                bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
            })
            .unwrap();
        ScreenState::Previewing(img)
    }

    #[test]
    fn snapshot_updates_report_projection() {
        let mut app = app();
        let state = previewing();
        let img = state.image().unwrap().clone();

        app.on_state(state);
        assert_eq!(app.report, ReportView::Hidden);

        app.on_state(ScreenState::Reported(
            img,
            AnalysisReport::from("## ok".to_string()),
        ));
        assert!(matches!(app.report, ReportView::Rendered(_)));
        assert_eq!(app.report_scroll, 0);
    }

    #[test]
    fn idle_snapshot_clears_typed_input() {
        let mut app = app();
        app.input.push_str("/tmp/label.png");
        app.on_state(previewing());
        assert_eq!(app.input, "/tmp/label.png");

        app.on_state(ScreenState::Idle);
        assert!(app.input.is_empty());
    }

    #[test]
    fn login_redirect_marks_session_unauthenticated() {
        let mut app = App::new(LogBuffer::new(), true, true);
        app.on_effect(Effect::RedirectToLogin);
        assert!(!app.authenticated);
        assert!(app.status.as_deref().unwrap_or("").contains("login"));
    }
}
