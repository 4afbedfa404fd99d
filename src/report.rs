// Report view state - what the result panel shows
//
// A pure projection of the screen state onto {nothing, spinner, rendered
// report, error message}. Turning the report's markdown into styled output
// is the TUI's job; the text passes through here unmodified.

use crate::api::{AnalysisError, AnalysisReport};
use crate::workflow::ScreenState;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReportView {
    /// No report panel content (Idle, Previewing).
    #[default]
    Hidden,
    /// Analysis in flight.
    Spinner,
    /// A report arrived; holds the unmodified markdown.
    Rendered(AnalysisReport),
    /// Analysis failed; holds the legible message to display.
    Failure(String),
}

impl ReportView {
    pub fn project(state: &ScreenState) -> Self {
        match state {
            ScreenState::Idle | ScreenState::Previewing(_) => ReportView::Hidden,
            ScreenState::Submitting(_) => ReportView::Spinner,
            ScreenState::Reported(_, report) => ReportView::Rendered(report.clone()),
            ScreenState::Failed(_, error) => ReportView::Failure(error.to_string()),
        }
    }

    pub fn clear(&mut self) {
        *self = ReportView::Hidden;
    }

    pub fn set_report(&mut self, report: AnalysisReport) {
        *self = ReportView::Rendered(report);
    }

    pub fn set_error(&mut self, error: &AnalysisError) {
        *self = ReportView::Failure(error.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureController, RawFile};
    use std::sync::Arc;

    fn image() -> Arc<crate::capture::CapturedImage> {
        let mut controller = CaptureController::new();
        controller
            .select(RawFile {
                name: "label.png".to_string(),
                bytes: b"\x89PNG\r\n\x1a\n".to_vec(),
            })
            .unwrap()
    }

    #[test]
    fn projection_covers_every_state() {
        let img = image();

        assert_eq!(ReportView::project(&ScreenState::Idle), ReportView::Hidden);
        assert_eq!(
            ReportView::project(&ScreenState::Previewing(img.clone())),
            ReportView::Hidden
        );
        assert_eq!(
            ReportView::project(&ScreenState::Submitting(img.clone())),
            ReportView::Spinner
        );

        let report = AnalysisReport::from("## Findings".to_string());
        match ReportView::project(&ScreenState::Reported(img.clone(), report.clone())) {
            ReportView::Rendered(r) => assert_eq!(r.text(), "## Findings"),
            other => panic!("expected Rendered, got {other:?}"),
        }

        match ReportView::project(&ScreenState::Failed(
            img,
            AnalysisError::Transport("timed out".to_string()),
        )) {
            ReportView::Failure(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected Failure, got {other:?}"),
        }
    }

    #[test]
    fn direct_mutators_follow_the_contract() {
        let mut view = ReportView::default();
        assert_eq!(view, ReportView::Hidden);

        view.set_report(AnalysisReport::from("ok".to_string()));
        assert!(matches!(view, ReportView::Rendered(_)));

        view.set_error(&AnalysisError::MalformedResponse);
        assert!(matches!(view, ReportView::Failure(_)));

        view.clear();
        assert_eq!(view, ReportView::Hidden);
    }
}
