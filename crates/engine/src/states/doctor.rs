use std::collections::BTreeSet;

use vital_core::model::{Answer, PatientId, Question, QuestionId};
use vital_core::rules::RuleSet;

use crate::engine::{ChatEngine, PendingAction};
use crate::error::TurnError;
use crate::session::{StateKind, WizardStage};
use crate::states::{DOCTOR_MENU_OPTIONS, INVALID_ANSWER, parse_yes_no};

/// Fixed clinician questionnaire: no remote fetch for this variant.
fn clinician_questions() -> Vec<Question> {
    vec![
        Question::new(QuestionId::new(1), "Does the patient have a fever?"),
        Question::new(QuestionId::new(2), "Does the patient have a persistent cough?"),
        Question::new(QuestionId::new(3), "Does the patient have difficulty breathing?"),
    ]
}

/// Parses a comma-separated, all-digit identification list. Rejects empty
/// lists and any token that is not purely digits.
fn parse_id_list(input: &str) -> Option<BTreeSet<PatientId>> {
    let mut ids = BTreeSet::new();
    for token in input.split(',') {
        let id = token.trim().parse::<PatientId>().ok()?;
        ids.insert(id);
    }
    if ids.is_empty() { None } else { Some(ids) }
}

impl ChatEngine {
    pub(crate) async fn on_doctor_menu(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        if self.session.user.is_none() {
            return Err(TurnError::CorruptSession);
        }

        match input.to_lowercase().as_str() {
            "1" | "rules" | "assessment" | "reglas" | "sistema de reglas" => {
                self.push(StateKind::DoctorRules, false).await;
            }
            "2" | "follow-up" | "follow up" | "seguimiento" => {
                self.push(StateKind::DoctorFollowUp, false).await;
            }
            "3" | "report" | "reports" | "reporte" => {
                self.push(StateKind::DoctorReport, false).await;
            }
            "4" | "sign out" | "exit" | "salir" => {
                self.push(StateKind::ExitConfirm, false).await;
            }
            _ => {
                self.warn_user(&format!("Invalid option. Choose:\n{DOCTOR_MENU_OPTIONS}"));
            }
        }
        Ok(None)
    }

    pub(crate) fn welcome_doctor_rules(&mut self) -> Result<(), TurnError> {
        self.session.begin_questionnaire(clinician_questions());
        self.say("Clinician assessment. Answer the questions about the patient:");
        self.prompt_next_question();
        Ok(())
    }

    /// Clinician questionnaire: same accumulate-and-advance loop as the
    /// patient flow, but the submission is never persisted and the fallback
    /// uses the clinician rule table.
    pub(crate) async fn on_doctor_rules(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let Some(value) = parse_yes_no(input) else {
            self.warn_user(INVALID_ANSWER);
            return Ok(None);
        };

        let Some((_, question)) = self.session.next_question() else {
            return Err(TurnError::CorruptSession);
        };
        let answer = Answer::new(question.id(), value);
        self.session.record_answer(answer);

        if !self.session.questionnaire_complete() {
            self.prompt_next_question();
            return Ok(None);
        }

        match self.api.submit_answers_unsaved(&self.session.answers).await {
            Ok(diagnosis) => {
                self.show_diagnosis("Diagnosis:", &diagnosis);
            }
            Err(err) => {
                tracing::warn!(error = %err, "unsaved submission failed; using the local rule table");
                let local = self.local_diagnosis(RuleSet::Clinician);
                self.show_diagnosis("Diagnosis (local, service unavailable):", &local);
            }
        }
        self.say("Information was NOT stored (clinician consultation only).");

        self.pop(true).await;
        Ok(None)
    }

    /// Follow-up: one identification, one history listing, one pop.
    pub(crate) async fn on_doctor_follow_up(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let Ok(patient) = input.parse::<PatientId>() else {
            self.warn_user("The identification must contain digits only. Try again.");
            return Ok(None);
        };

        self.say(&format!("Looking up the history for patient {patient}..."));
        self.render_history(&patient, false).await;
        self.pop(true).await;
        Ok(None)
    }

    /// Two-step report wizard. The wizard state lives on the session, so
    /// both stages run inside this one state with no stack churn; invalid
    /// input re-prompts without losing the stage or the collected ids.
    pub(crate) async fn on_doctor_report(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let stage = self
            .session
            .report
            .as_ref()
            .ok_or(TurnError::CorruptSession)?
            .stage();

        match stage {
            WizardStage::AwaitingIds => {
                let Some(ids) = parse_id_list(input) else {
                    self.warn_user(
                        "Invalid identification list. Enter digits separated by commas (e.g. 123,456).",
                    );
                    return Ok(None);
                };
                self.session
                    .report
                    .as_mut()
                    .ok_or(TurnError::CorruptSession)?
                    .accept_ids(ids);
                self.say("Enter the email address that will receive the report:");
            }
            WizardStage::AwaitingEmail => {
                if !input.contains('@') || !input.contains('.') {
                    self.warn_user("Invalid email address. Try again.");
                    return Ok(None);
                }

                let ids: Vec<PatientId> = self
                    .session
                    .report
                    .as_ref()
                    .ok_or(TurnError::CorruptSession)?
                    .patient_ids()
                    .iter()
                    .cloned()
                    .collect();
                self.say(&format!(
                    "Generating the report for {} patient(s) and sending it to {input}...",
                    ids.len()
                ));

                match self.deliver_report(&ids, input).await {
                    Ok(()) => self.say("Report sent successfully. Check your inbox."),
                    Err(err) => {
                        tracing::warn!(error = %err, "report delivery failed");
                        self.warn_user(&format!("Could not generate or send the report: {err}."));
                    }
                }
                self.pop(true).await;
            }
        }
        Ok(None)
    }

    async fn deliver_report(
        &self,
        ids: &[PatientId],
        email: &str,
    ) -> Result<(), gateway::ReportError> {
        let files = self.reports.generate_report(ids).await?;
        self.reports.send_report(email, &files).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{clinician_engine, signed_in};
    use gateway::Endpoint;

    #[test]
    fn id_list_parsing_accepts_digits_and_rejects_the_rest() {
        let ids = parse_id_list("123, 456").unwrap();
        assert_eq!(ids.len(), 2);

        assert!(parse_id_list("123,abc").is_none());
        assert!(parse_id_list("").is_none());
        assert!(parse_id_list("12 34").is_none());
        assert!(parse_id_list(",").is_none());
    }

    #[tokio::test]
    async fn bronchitis_verdict_for_fever_and_cough_without_breathing_trouble() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        let menu_depth = h.engine.session().depth();

        h.engine.handle("1").await;
        assert_eq!(h.engine.session().active(), StateKind::DoctorRules);
        h.engine.handle("yes").await;
        h.engine.handle("yes").await;
        h.engine.handle("no").await;

        assert!(h.sink.saw("possible bronchitis/respiratory infection"));
        assert!(h.sink.saw("Information was NOT stored"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
    }

    #[tokio::test]
    async fn submit_outage_falls_back_to_the_clinician_table() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.api.set_outage(Endpoint::Submit, true);

        h.engine.handle("1").await;
        h.engine.handle("no").await;
        h.engine.handle("no").await;
        h.engine.handle("yes").await;

        assert!(h.sink.saw("Diagnosis (local, service unavailable):"));
        assert!(h.sink.saw("possible pneumonia/severe respiratory illness"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
    }

    #[tokio::test]
    async fn follow_up_rejects_non_digit_identifications() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.engine.handle("2").await;
        assert_eq!(h.engine.session().active(), StateKind::DoctorFollowUp);

        h.engine.handle("abc123").await;

        assert!(h.sink.saw("digits only"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorFollowUp);
    }

    #[tokio::test]
    async fn follow_up_renders_history_and_returns_to_the_menu() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.engine.handle("2").await;

        h.engine.handle("1002003004").await;

        assert!(h.sink.saw("Looking up the history for patient 1002003004"));
        assert!(h.sink.saw("No history on record"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
    }

    #[tokio::test]
    async fn report_wizard_keeps_its_stage_across_invalid_email_input() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        let menu_depth = h.engine.session().depth();

        h.engine.handle("3").await;
        assert_eq!(h.engine.session().active(), StateKind::DoctorReport);

        h.engine.handle("123,456").await;
        let wizard = h.engine.session().report().unwrap();
        assert_eq!(wizard.stage(), WizardStage::AwaitingEmail);
        assert_eq!(wizard.patient_ids().len(), 2);

        h.engine.handle("foo").await;
        let wizard = h.engine.session().report().unwrap();
        assert_eq!(wizard.stage(), WizardStage::AwaitingEmail);
        assert_eq!(wizard.patient_ids().len(), 2);
        assert!(h.sink.saw("Invalid email address"));

        h.engine.handle("doc@example.com").await;

        assert_eq!(h.reports.generated_calls(), 1);
        assert_eq!(h.reports.sent_calls(), 1);
        assert!(h.sink.saw("Report sent successfully"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
        assert!(h.engine.session().report().is_none());
    }

    #[tokio::test]
    async fn malformed_id_list_reprompts_in_the_same_stage() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.engine.handle("3").await;

        h.engine.handle("123,not-a-number").await;

        let wizard = h.engine.session().report().unwrap();
        assert_eq!(wizard.stage(), WizardStage::AwaitingIds);
        assert!(h.sink.saw("Invalid identification list"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorReport);
    }

    #[tokio::test]
    async fn failed_delivery_still_ends_the_flow_with_one_pop() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        let menu_depth = h.engine.session().depth();
        h.reports.fail_sending(true);

        h.engine.handle("3").await;
        h.engine.handle("789").await;
        h.engine.handle("doc@example.com").await;

        assert!(h.sink.saw("Could not generate or send the report"));
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
    }
}
