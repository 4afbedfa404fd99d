//! Scenario tests for the screen state machine
//!
//! The orchestrator is driven through `apply` with a scripted analyzer
//! behind the trait seam, so every interleaving (including late and stale
//! completions) is deterministic.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use futures::future;

use super::*;
use crate::api::AnalysisReport;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

fn png(name: &str) -> RawFile {
    RawFile {
        name: name.to_string(),
        bytes: PNG_MAGIC.to_vec(),
    }
}

fn report(text: &str) -> AnalysisReport {
    AnalysisReport::from(text.to_string())
}

/// Analyzer that replays a scripted queue of outcomes and counts calls.
struct ScriptedAnalyzer {
    script: Mutex<VecDeque<Result<AnalysisReport, AnalysisError>>>,
    calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    fn new(script: Vec<Result<AnalysisReport, AnalysisError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn analyze(
        &self,
        _request: AnalysisRequest,
    ) -> futures::future::BoxFuture<'static, Result<AnalysisReport, AnalysisError>> {
        use futures::FutureExt;
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("analyze called more often than scripted");
        async move { next }.boxed()
    }
}

/// Analyzer whose call never resolves, for in-flight interleavings.
struct PendingAnalyzer {
    calls: AtomicUsize,
}

impl PendingAnalyzer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Analyzer for PendingAnalyzer {
    fn analyze(
        &self,
        _request: AnalysisRequest,
    ) -> futures::future::BoxFuture<'static, Result<AnalysisReport, AnalysisError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(future::pending())
    }
}

fn orchestrator<A: Analyzer>(
    analyzer: Arc<A>,
    require_auth: bool,
) -> (Orchestrator<A>, WorkflowHandles) {
    Orchestrator::new(analyzer, SessionStore::in_memory(), require_auth)
}

/// Drain the pending completion that the spawned analysis task fed back
/// into the command queue, and apply it.
async fn apply_next_completion<A: Analyzer>(orch: &mut Orchestrator<A>) {
    let command = orch
        .commands_rx
        .recv()
        .await
        .expect("expected a completion command");
    assert!(matches!(command, Command::Resolved { .. }));
    orch.apply(command);
}

#[tokio::test]
async fn scenario_select_submit_report() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(report("## Safe to eat"))]);
    let (mut orch, mut handles) = orchestrator(analyzer.clone(), false);

    orch.apply(Command::Select(png("label.jpg")));
    match &orch.state {
        ScreenState::Previewing(img) => assert_eq!(img.preview.display_name, "label.jpg"),
        other => panic!("expected Previewing, got {}", other.name()),
    }

    orch.apply(Command::Submit);
    assert!(matches!(orch.state, ScreenState::Submitting(_)));

    apply_next_completion(&mut orch).await;
    match &orch.state {
        ScreenState::Reported(_, report) => assert_eq!(report.text(), "## Safe to eat"),
        other => panic!("expected Reported, got {}", other.name()),
    }
    assert_eq!(analyzer.calls(), 1);

    // Subscribers observe the final snapshot.
    assert!(handles.states.has_changed().unwrap());
    assert!(matches!(
        &*handles.states.borrow_and_update(),
        ScreenState::Reported(_, _)
    ));
}

#[tokio::test]
async fn previewing_holds_most_recently_selected_image() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, _handles) = orchestrator(analyzer, false);

    orch.apply(Command::Select(png("first.png")));
    let first_id = orch.state.image().unwrap().id;
    orch.apply(Command::Select(png("second.png")));

    let img = orch.state.image().expect("image should be active");
    assert_ne!(img.id, first_id);
    assert_eq!(img.preview.display_name, "second.png");
    assert!(matches!(orch.state, ScreenState::Previewing(_)));
}

#[tokio::test]
async fn invalid_candidate_leaves_state_untouched() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, mut handles) = orchestrator(analyzer, false);

    orch.apply(Command::Select(png("good.png")));
    let active_id = orch.state.image().unwrap().id;

    orch.apply(Command::Select(RawFile {
        name: "bad.txt".to_string(),
        bytes: b"plain text".to_vec(),
    }));

    assert_eq!(orch.state.image().unwrap().id, active_id);
    assert!(matches!(
        handles.effects.try_recv(),
        Ok(Effect::InvalidImage(_))
    ));
}

#[tokio::test]
async fn discard_from_any_state_yields_idle() {
    // From Previewing.
    let (mut orch, _h) = orchestrator(PendingAnalyzer::new(), false);
    orch.apply(Command::Select(png("a.png")));
    orch.apply(Command::Discard);
    assert!(matches!(orch.state, ScreenState::Idle));
    assert!(orch.capture.active().is_none());

    // From Failed.
    let analyzer = ScriptedAnalyzer::new(vec![Err(AnalysisError::Server { status: 500 })]);
    let (mut orch, _h) = orchestrator(analyzer, false);
    orch.apply(Command::Select(png("a.png")));
    orch.apply(Command::Submit);
    apply_next_completion(&mut orch).await;
    assert!(matches!(orch.state, ScreenState::Failed(_, _)));
    orch.apply(Command::Discard);
    assert!(matches!(orch.state, ScreenState::Idle));
    assert!(orch.capture.active().is_none());

    // Already Idle: idempotent.
    orch.apply(Command::Discard);
    assert!(matches!(orch.state, ScreenState::Idle));
}

#[tokio::test]
async fn submit_without_image_never_invokes_analyzer() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, _handles) = orchestrator(analyzer.clone(), false);

    orch.apply(Command::Submit);
    assert!(matches!(orch.state, ScreenState::Idle));
    assert_eq!(analyzer.calls(), 0);
}

#[tokio::test]
async fn submit_while_submitting_is_ignored() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, _handles) = orchestrator(analyzer.clone(), false);

    orch.apply(Command::Select(png("a.png")));
    orch.apply(Command::Submit);
    // Let the spawned analysis task start before anything else happens.
    tokio::task::yield_now().await;

    orch.apply(Command::Submit);
    tokio::task::yield_now().await;

    assert_eq!(analyzer.calls(), 1);
    assert!(matches!(orch.state, ScreenState::Submitting(_)));
}

#[tokio::test]
async fn scenario_missing_credential_redirects_to_login() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, mut handles) = orchestrator(analyzer.clone(), true);

    orch.apply(Command::Select(png("label.jpg")));
    orch.apply(Command::Submit);

    // No network call, no state change, session untouched.
    assert_eq!(analyzer.calls(), 0);
    assert!(matches!(orch.state, ScreenState::Previewing(_)));
    assert!(!orch.session.is_authenticated());
    assert!(matches!(
        handles.effects.try_recv(),
        Ok(Effect::RedirectToLogin)
    ));
}

#[tokio::test]
async fn scenario_unauthorized_clears_credential() {
    let analyzer = ScriptedAnalyzer::new(vec![Err(AnalysisError::Unauthorized)]);
    let (mut orch, mut handles) = orchestrator(analyzer, true);
    orch.apply(Command::Authenticated("stale-token".to_string()));

    orch.apply(Command::Select(png("label.jpg")));
    orch.apply(Command::Submit);
    apply_next_completion(&mut orch).await;

    assert!(matches!(
        orch.state,
        ScreenState::Failed(_, AnalysisError::Unauthorized)
    ));
    assert!(!orch.session.is_authenticated());
    assert!(matches!(
        handles.effects.try_recv(),
        Ok(Effect::RedirectToLogin)
    ));
}

#[tokio::test]
async fn scenario_transport_failure_then_retry_with_same_image() {
    let analyzer = ScriptedAnalyzer::new(vec![
        Err(AnalysisError::Transport("timed out".to_string())),
        Ok(report("retry worked")),
    ]);
    let (mut orch, _handles) = orchestrator(analyzer, false);

    orch.apply(Command::Select(png("label.jpg")));
    let image_id = orch.state.image().unwrap().id;

    orch.apply(Command::Submit);
    apply_next_completion(&mut orch).await;
    assert!(matches!(
        orch.state,
        ScreenState::Failed(_, AnalysisError::Transport(_))
    ));

    // Resubmitting from Failed discards the prior error and reuses the
    // same captured image.
    orch.apply(Command::Submit);
    match &orch.state {
        ScreenState::Submitting(img) => assert_eq!(img.id, image_id),
        other => panic!("expected Submitting, got {}", other.name()),
    }

    apply_next_completion(&mut orch).await;
    assert!(matches!(orch.state, ScreenState::Reported(_, _)));
}

#[tokio::test]
async fn scenario_discard_during_submitting_suppresses_completion() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, _handles) = orchestrator(analyzer, false);

    orch.apply(Command::Select(png("label.jpg")));
    let image_id = orch.state.image().unwrap().id;
    orch.apply(Command::Submit);
    assert!(matches!(orch.state, ScreenState::Submitting(_)));

    orch.apply(Command::Discard);
    assert!(matches!(orch.state, ScreenState::Idle));

    // Even if the aborted call had already produced a result, it no longer
    // matches an in-flight request and must not be applied.
    orch.apply(Command::Resolved {
        image: image_id,
        outcome: Ok(report("too late")),
    });
    assert!(matches!(orch.state, ScreenState::Idle));
}

#[tokio::test]
async fn stale_completion_for_replaced_image_is_dropped() {
    let analyzer = PendingAnalyzer::new();
    let (mut orch, _handles) = orchestrator(analyzer, false);

    orch.apply(Command::Select(png("old.png")));
    let old_id = orch.state.image().unwrap().id;
    orch.apply(Command::Submit);

    // Replacing the image supersedes the outstanding request.
    orch.apply(Command::Select(png("new.png")));
    let new_id = orch.state.image().unwrap().id;
    assert!(matches!(orch.state, ScreenState::Previewing(_)));

    orch.apply(Command::Resolved {
        image: old_id,
        outcome: Ok(report("stale")),
    });

    let img = orch.state.image().unwrap();
    assert_eq!(img.id, new_id);
    assert!(matches!(orch.state, ScreenState::Previewing(_)));
}

#[tokio::test]
async fn run_loop_processes_commands_and_shuts_down() {
    let analyzer = ScriptedAnalyzer::new(vec![Ok(report("## Safe to eat"))]);
    let (orch, mut handles) = orchestrator(analyzer, false);
    let task = tokio::spawn(orch.run());

    handles
        .commands
        .send(Command::Select(png("label.jpg")))
        .await
        .unwrap();
    handles.commands.send(Command::Submit).await.unwrap();

    // Wait for the Reported snapshot to be published.
    loop {
        handles.states.changed().await.unwrap();
        let state = handles.states.borrow_and_update().clone();
        if let ScreenState::Reported(_, report) = state {
            assert_eq!(report.text(), "## Safe to eat");
            break;
        }
    }

    handles.commands.send(Command::Shutdown).await.unwrap();
    task.await.unwrap();
}
