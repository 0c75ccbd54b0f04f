//! Transition logic for every conversational state.
//!
//! Handlers are grouped by flow: sign-in, patient flows, clinician flows,
//! and the yes/no confirmation states. Each handler validates its input,
//! talks to the gateway where needed, navigates via the engine's stack
//! primitives, and emits messages through the sink. Validation failures
//! re-prompt in place; remote failures either fall back to the local rule
//! tables or surface a message, and the flow still terminates.

mod confirm;
mod doctor;
mod login;
mod patient;

use vital_core::model::{Diagnosis, PatientId};
use vital_core::rules::RuleSet;

use crate::engine::ChatEngine;
use crate::error::TurnError;
use crate::session::StateKind;

//
// ─── SHARED PROMPTS ────────────────────────────────────────────────────────────
//

pub(crate) const INITIAL_WELCOME: &str =
    "Hello! Please sign in with your username and password to continue.";

pub(crate) const EMPTY_INPUT: &str =
    "Fields cannot be left empty. Please answer the question.";

pub(crate) const INVALID_YES_NO: &str = "Invalid option. Please answer Yes or No.";

pub(crate) const INVALID_ANSWER: &str = "Invalid answer. Please answer Yes or No.";

pub(crate) const PATIENT_MENU_OPTIONS: &str =
    "Available options:\n1) Rule-based assessment\n2) Progress and history\n3) Sign out";

pub(crate) const PROGRESS_MENU_OPTIONS: &str =
    "Progress and history:\n1) Record a progress note\n2) View your history\n3) Back";

pub(crate) const HISTORY_OPTIONS: &str =
    "History lookup:\n1) Full history\n2) Latest entry only\n3) Back";

pub(crate) const DOCTOR_MENU_OPTIONS: &str =
    "Available options:\n1) Rule-based assessment\n2) Patient follow-up\n3) Reports\n4) Sign out";

//
// ─── MATCHING ──────────────────────────────────────────────────────────────────
//

/// Yes/no synonym matching shared by every confirmation and questionnaire
/// prompt. Accepts the Spanish forms the original users type.
pub(crate) fn parse_yes_no(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "yes" | "y" | "si" | "sí" | "s" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

impl ChatEngine {
    /// Emits the welcome message of the active state. May fetch remote data
    /// (the patient questionnaire); a failure here is handled by the stack
    /// primitives, which restore a valid state.
    pub(crate) async fn welcome(&mut self) -> Result<(), TurnError> {
        match self.session.active {
            StateKind::Initial => {
                self.say(INITIAL_WELCOME);
                Ok(())
            }
            StateKind::LoginOptions => self.welcome_login_options(),
            StateKind::PatientMenu => {
                self.say(PATIENT_MENU_OPTIONS);
                Ok(())
            }
            StateKind::PatientRules => self.welcome_patient_rules().await,
            StateKind::PatientProgressMenu => {
                self.say(PROGRESS_MENU_OPTIONS);
                Ok(())
            }
            StateKind::PatientProgress => {
                self.say("Progress log. Describe how you feel or any health updates:");
                Ok(())
            }
            StateKind::PatientHistory => {
                self.say(HISTORY_OPTIONS);
                Ok(())
            }
            StateKind::DoctorMenu => {
                self.say(DOCTOR_MENU_OPTIONS);
                Ok(())
            }
            StateKind::DoctorRules => self.welcome_doctor_rules(),
            StateKind::DoctorFollowUp => {
                self.say("Patient follow-up. Enter the patient's identification number:");
                Ok(())
            }
            StateKind::DoctorReport => {
                self.say(
                    "Report system. Enter the patient identification numbers, separated by commas:",
                );
                Ok(())
            }
            StateKind::ExitConfirm => {
                self.say("Are you sure you want to sign out? (Yes/No)");
                Ok(())
            }
            StateKind::ReturnPrompt => {
                self.say("Do you want to go back? (Yes/No)");
                Ok(())
            }
        }
    }

    /// Shows the next unanswered question, numbered from 1.
    pub(crate) fn prompt_next_question(&self) {
        if let Some((index, question)) = self.session.next_question() {
            let line = format!("{}. {} (Yes/No)", index + 1, question.prompt());
            self.say(&line);
        }
    }

    /// Evaluates the accumulated answers against a local rule table.
    pub(crate) fn local_diagnosis(&self, rules: RuleSet) -> Diagnosis {
        let values: Vec<bool> = self.session.answers.iter().map(|a| a.value()).collect();
        Diagnosis::text(rules.evaluate(&values))
    }

    /// Emits a diagnosis under a header, one line per display line.
    pub(crate) fn show_diagnosis(&self, header: &str, diagnosis: &Diagnosis) {
        let body = diagnosis.display_lines().join("\n");
        self.say(&format!("{header}\n{body}"));
    }

    /// Fetches and renders a history listing as bullet lines with a
    /// terminator, or a friendly notice when nothing is on record.
    pub(crate) async fn render_history(&mut self, id: &PatientId, only_last: bool) {
        match self.api.fetch_history(id, only_last).await {
            Ok(entries) if entries.is_empty() => {
                self.say("No history on record for this identification.");
            }
            Ok(entries) => {
                for entry in &entries {
                    self.say(&format!("• {}", entry.summary_line()));
                }
                self.say("End of history.");
            }
            Err(err) => {
                tracing::warn!(error = %err, "history fetch failed");
                self.warn_user(&format!("Could not retrieve the history: {err}."));
            }
        }
    }
}
