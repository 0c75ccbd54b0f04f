use std::sync::Arc;

use gateway::{HealthApi, ReportDelivery};

use crate::error::TurnError;
use crate::session::{ReportWizard, Session, StackEntry, StateKind};
use crate::sink::{MessageKind, MessageSink};
use crate::states;

/// Action the engine hands back to the shell instead of pacing it itself.
/// The engine has already moved to a valid state by the time one of these is
/// returned; the shell may delay its rendering, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum PendingAction {
    /// The session ended and the sign-in banner was re-shown.
    SessionReset,
}

/// Drives one conversational session against the remote health API.
///
/// Exactly one `handle` call is in flight at a time; inputs are serialized
/// by the surrounding shell. Every `handle` call resolves to a valid active
/// state no matter which remote calls fail along the way.
pub struct ChatEngine {
    pub(crate) session: Session,
    pub(crate) api: Arc<dyn HealthApi>,
    pub(crate) reports: Arc<dyn ReportDelivery>,
    pub(crate) sink: Arc<dyn MessageSink>,
}

impl ChatEngine {
    #[must_use]
    pub fn new(
        api: Arc<dyn HealthApi>,
        reports: Arc<dyn ReportDelivery>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        Self {
            session: Session::new(),
            api,
            reports,
            sink,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Emits the sign-in banner. Call once before the first input.
    pub fn start(&self) {
        self.say(states::INITIAL_WELCOME);
    }

    /// Processes one line of user input and returns an optional deferred
    /// action for the shell. Never panics and never leaves the session in an
    /// unrecoverable state.
    pub async fn handle(&mut self, raw: &str) -> Option<PendingAction> {
        let input = normalize(raw);
        if input.is_empty() {
            self.warn_user(states::EMPTY_INPUT);
            return None;
        }

        tracing::debug!(state = ?self.session.active, "processing input");
        match self.dispatch(&input).await {
            Ok(action) => action,
            Err(err) => self.recover(&err),
        }
    }

    async fn dispatch(&mut self, input: &str) -> Result<Option<PendingAction>, TurnError> {
        match self.session.active {
            StateKind::Initial => self.on_initial(input).await,
            StateKind::LoginOptions => self.on_login_options(input).await,
            StateKind::PatientMenu => self.on_patient_menu(input).await,
            StateKind::PatientRules => self.on_patient_rules(input).await,
            StateKind::PatientProgressMenu => self.on_patient_progress_menu(input).await,
            StateKind::PatientProgress => self.on_patient_progress(input).await,
            StateKind::PatientHistory => self.on_patient_history(input).await,
            StateKind::DoctorMenu => self.on_doctor_menu(input).await,
            StateKind::DoctorRules => self.on_doctor_rules(input).await,
            StateKind::DoctorFollowUp => self.on_doctor_follow_up(input).await,
            StateKind::DoctorReport => self.on_doctor_report(input).await,
            StateKind::ExitConfirm => self.on_exit_confirm(input).await,
            StateKind::ReturnPrompt => self.on_return_prompt(input).await,
        }
    }

    /// Last-resort recovery for errors no state handled: fatal to the flow,
    /// never to the process.
    fn recover(&mut self, err: &TurnError) -> Option<PendingAction> {
        tracing::error!(error = %err, "turn failed; resetting the session");
        self.warn_user("Something went wrong on our side. Returning to the start.");
        self.reset(false);
        None
    }

    //
    // ─── CONTEXT STACK ─────────────────────────────────────────────────────
    //

    /// Saves the active state on the stack and enters `next`. A welcome
    /// failure (e.g. the questionnaire fetch) restores the parent state, so
    /// `active` is never left undefined.
    pub(crate) async fn push(&mut self, next: StateKind, silent: bool) {
        tracing::debug!(from = ?self.session.active, to = ?next, silent, "push");
        self.session.stack.push(StackEntry {
            state: self.session.active,
            silent,
        });
        self.session.active = next;
        if next == StateKind::DoctorReport {
            self.session.report = Some(ReportWizard::new());
        }
        if !silent {
            if let Err(err) = self.welcome().await {
                tracing::warn!(error = %err, "could not enter state; restoring parent");
                self.warn_user(&format!("Could not open this option: {err}."));
                self.pop(true).await;
            }
        }
    }

    /// Returns to the stacked parent state. The parent's welcome is restated
    /// only when neither this pop nor the original push was silent. An empty
    /// stack degenerates to a reset.
    pub(crate) async fn pop(&mut self, silent: bool) {
        let Some(entry) = self.session.stack.pop() else {
            tracing::debug!("pop on empty stack; resetting");
            self.reset(false);
            return;
        };

        let leaving = self.session.active;
        self.session.active = entry.state;
        if leaving == StateKind::DoctorReport {
            self.session.report = None;
        }
        tracing::debug!(from = ?leaving, to = ?entry.state, "pop");

        if !silent && !entry.silent {
            if let Err(err) = self.welcome().await {
                tracing::warn!(error = %err, "welcome failed after pop; resetting");
                self.warn_user(&format!("Could not return to the previous step: {err}."));
                self.reset(false);
            }
        }
    }

    /// Wipes the session back to the sign-in state. Optionally asks the sink
    /// to clear its visible transcript.
    pub(crate) fn reset(&mut self, clear_transcript: bool) {
        self.session = Session::new();
        if clear_transcript {
            self.sink.clear_transcript();
        }
        self.say(states::INITIAL_WELCOME);
    }

    //
    // ─── OUTPUT ────────────────────────────────────────────────────────────
    //

    pub(crate) fn say(&self, text: &str) {
        self.sink.post(text, false, MessageKind::Normal);
    }

    pub(crate) fn warn_user(&self, text: &str) {
        self.sink.post(text, false, MessageKind::Error);
    }
}

/// Collapses whitespace runs and trims, so `" a   b "` and `"a b"` read the
/// same everywhere.
fn normalize(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
