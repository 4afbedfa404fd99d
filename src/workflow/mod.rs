// Workflow orchestrator - the observable screen state machine
//
// One task owns the screen state and every component under it. User events
// and internal completion events arrive on a single command channel and are
// applied in arrival order, so no parallel path ever contends for the state.
// Every transition publishes a fresh `ScreenState` snapshot on a watch
// channel; any presentation layer subscribes and redraws. Side effects that
// are not state (login redirect, rejected candidate) go out on a separate
// effect channel.
//
// Credential-required yes/no is a single flag on the orchestrator: the same
// machine serves both the anonymous and the authenticated flow.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{AnalysisError, AnalysisReport, AnalysisRequest, Analyzer};
use crate::capture::{CaptureController, CapturedImage, ImageId, RawFile};
use crate::session::SessionStore;

#[cfg(test)]
mod tests;

/// What the user currently sees. An image is present in every state except
/// `Idle`; the machine is cyclic and returns to `Idle` on every discard.
#[derive(Debug, Clone, Default)]
pub enum ScreenState {
    #[default]
    Idle,
    Previewing(Arc<CapturedImage>),
    Submitting(Arc<CapturedImage>),
    Reported(Arc<CapturedImage>, AnalysisReport),
    Failed(Arc<CapturedImage>, AnalysisError),
}

impl ScreenState {
    pub fn image(&self) -> Option<&Arc<CapturedImage>> {
        match self {
            ScreenState::Idle => None,
            ScreenState::Previewing(img)
            | ScreenState::Submitting(img)
            | ScreenState::Reported(img, _)
            | ScreenState::Failed(img, _) => Some(img),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ScreenState::Idle => "Idle",
            ScreenState::Previewing(_) => "Previewing",
            ScreenState::Submitting(_) => "Submitting",
            ScreenState::Reported(_, _) => "Reported",
            ScreenState::Failed(_, _) => "Failed",
        }
    }
}

/// Events processed by the orchestrator, in arrival order. `Resolved` is
/// internal: the spawned analysis task feeds its outcome back through the
/// same queue so completions interleave with user events deterministically.
#[derive(Debug)]
pub enum Command {
    /// User picked a candidate file.
    Select(RawFile),
    /// User discarded the current image (retake).
    Discard,
    /// User asked for analysis of the current image.
    Submit,
    /// A login completed; store the credential.
    Authenticated(String),
    /// User logged out; forget the credential.
    Logout,
    /// An analysis task finished for the tagged image.
    Resolved {
        image: ImageId,
        outcome: Result<AnalysisReport, AnalysisError>,
    },
    /// Stop the orchestrator task.
    Shutdown,
}

/// Out-of-band notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// A protected action needs a credential; hand off to the login
    /// collaborator instead of submitting.
    RedirectToLogin,
    /// A candidate file failed capture validation; prior state untouched.
    InvalidImage(String),
}

/// Channel ends handed to the host application.
pub struct WorkflowHandles {
    pub commands: mpsc::Sender<Command>,
    pub states: watch::Receiver<ScreenState>,
    pub effects: mpsc::Receiver<Effect>,
}

struct Inflight {
    image: ImageId,
    task: JoinHandle<()>,
}

pub struct Orchestrator<A: Analyzer> {
    analyzer: Arc<A>,
    session: SessionStore,
    capture: CaptureController,
    require_auth: bool,
    state: ScreenState,
    inflight: Option<Inflight>,
    commands_tx: mpsc::Sender<Command>,
    commands_rx: mpsc::Receiver<Command>,
    state_tx: watch::Sender<ScreenState>,
    effects_tx: mpsc::Sender<Effect>,
}

impl<A: Analyzer> Orchestrator<A> {
    pub fn new(
        analyzer: Arc<A>,
        session: SessionStore,
        require_auth: bool,
    ) -> (Self, WorkflowHandles) {
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (state_tx, states) = watch::channel(ScreenState::Idle);
        let (effects_tx, effects) = mpsc::channel(16);

        let orchestrator = Self {
            analyzer,
            session,
            capture: CaptureController::new(),
            require_auth,
            state: ScreenState::Idle,
            inflight: None,
            commands_tx: commands_tx.clone(),
            commands_rx,
            state_tx,
            effects_tx,
        };

        (
            orchestrator,
            WorkflowHandles {
                commands: commands_tx,
                states,
                effects,
            },
        )
    }

    /// Consume commands until `Shutdown` arrives or every sender is gone.
    pub async fn run(mut self) {
        while let Some(command) = self.commands_rx.recv().await {
            if matches!(command, Command::Shutdown) {
                break;
            }
            self.apply(command);
        }
        self.cancel_inflight();
        tracing::debug!("orchestrator stopped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Select(raw) => self.on_select(raw),
            Command::Discard => self.on_discard(),
            Command::Submit => self.on_submit(),
            Command::Authenticated(token) => self.session.set_credential(token),
            Command::Logout => self.session.clear_credential(),
            Command::Resolved { image, outcome } => self.on_resolved(image, outcome),
            Command::Shutdown => unreachable!("handled by run()"),
        }
    }

    fn on_select(&mut self, raw: RawFile) {
        match self.capture.select(raw) {
            Ok(image) => {
                // Replacing the image supersedes any outstanding analysis.
                self.cancel_inflight();
                self.set_state(ScreenState::Previewing(image));
            }
            Err(e) => {
                tracing::warn!(error = %e, "rejected candidate image");
                self.notify(Effect::InvalidImage(e.to_string()));
            }
        }
    }

    fn on_discard(&mut self) {
        self.cancel_inflight();
        self.capture.discard();
        if !matches!(self.state, ScreenState::Idle) {
            self.set_state(ScreenState::Idle);
        }
    }

    fn on_submit(&mut self) {
        let image = match &self.state {
            ScreenState::Previewing(img) | ScreenState::Failed(img, _) => img.clone(),
            ScreenState::Submitting(_) => {
                tracing::debug!("submit ignored: analysis already in flight");
                return;
            }
            ScreenState::Idle => {
                tracing::debug!("submit ignored: no image selected");
                return;
            }
            ScreenState::Reported(_, _) => {
                tracing::debug!("submit ignored: report already present");
                return;
            }
        };

        if self.require_auth && !self.session.is_authenticated() {
            tracing::info!("credential required for analysis; redirecting to login");
            self.notify(Effect::RedirectToLogin);
            return;
        }

        let request = AnalysisRequest::new(
            image.clone(),
            self.session.credential().map(str::to_owned),
        );
        let image_id = image.id;
        let analyzer = self.analyzer.clone();
        let commands = self.commands_tx.clone();

        let task = tokio::spawn(async move {
            let outcome = analyzer.analyze(request).await;
            // The orchestrator may have shut down; nothing to do then.
            let _ = commands
                .send(Command::Resolved {
                    image: image_id,
                    outcome,
                })
                .await;
        });

        self.inflight = Some(Inflight {
            image: image_id,
            task,
        });
        self.set_state(ScreenState::Submitting(image));
    }

    fn on_resolved(
        &mut self,
        image: ImageId,
        outcome: Result<AnalysisReport, AnalysisError>,
    ) {
        match &self.inflight {
            Some(inflight) if inflight.image == image => {}
            _ => {
                tracing::debug!(%image, "dropping completion for superseded request");
                return;
            }
        }
        self.inflight = None;

        let ScreenState::Submitting(img) = self.state.clone() else {
            tracing::debug!(%image, state = self.state.name(),
                "dropping completion: not submitting");
            return;
        };

        match outcome {
            Ok(report) => {
                tracing::info!(%image, "analysis report received");
                self.set_state(ScreenState::Reported(img, report));
            }
            Err(error) => {
                tracing::warn!(%image, %error, "analysis failed");
                if error == AnalysisError::Unauthorized {
                    self.session.clear_credential();
                    self.notify(Effect::RedirectToLogin);
                }
                self.set_state(ScreenState::Failed(img, error));
            }
        }
    }

    fn cancel_inflight(&mut self) {
        if let Some(inflight) = self.inflight.take() {
            tracing::debug!(image = %inflight.image, "aborting in-flight analysis");
            inflight.task.abort();
        }
    }

    fn set_state(&mut self, next: ScreenState) {
        tracing::debug!(from = self.state.name(), to = next.name(), "screen transition");
        self.state = next.clone();
        // Subscribers may come and go; a send with no receivers is fine.
        let _ = self.state_tx.send(next);
    }

    fn notify(&self, effect: Effect) {
        if self.effects_tx.try_send(effect).is_err() {
            tracing::warn!("effect dropped: no listener or channel full");
        }
    }
}
