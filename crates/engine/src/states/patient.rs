use gateway::AnswerSubmission;
use vital_core::model::Answer;
use vital_core::rules::RuleSet;

use crate::engine::{ChatEngine, PendingAction};
use crate::error::TurnError;
use crate::session::StateKind;
use crate::states::{
    HISTORY_OPTIONS, INVALID_ANSWER, PATIENT_MENU_OPTIONS, PROGRESS_MENU_OPTIONS, parse_yes_no,
};

impl ChatEngine {
    pub(crate) async fn on_patient_menu(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        if self.session.user.is_none() {
            return Err(TurnError::CorruptSession);
        }

        match input.to_lowercase().as_str() {
            "1" | "rules" | "assessment" | "reglas" | "sistema de reglas" => {
                self.push(StateKind::PatientRules, false).await;
            }
            "2" | "progress" | "history" | "progreso" | "historial" => {
                self.push(StateKind::PatientProgressMenu, false).await;
            }
            "3" | "sign out" | "exit" | "salir" => {
                self.push(StateKind::ExitConfirm, false).await;
            }
            _ => {
                self.warn_user(&format!("Invalid option. Choose:\n{PATIENT_MENU_OPTIONS}"));
            }
        }
        Ok(None)
    }

    /// Questionnaire entry: fetch the question list, clear the accumulator,
    /// show question 1. Any failure aborts the entry and the stack manager
    /// restores the menu.
    pub(crate) async fn welcome_patient_rules(&mut self) -> Result<(), TurnError> {
        let questions = self.api.fetch_questions().await?;
        if questions.is_empty() {
            return Err(TurnError::EmptyQuestionnaire);
        }

        self.session.begin_questionnaire(questions);
        self.say("Assessment activated. Answer the following questions to receive a diagnosis:");
        self.prompt_next_question();
        Ok(())
    }

    /// One yes/no answer per turn. On the final answer the full vector is
    /// submitted; a transport failure falls back to the local patient rule
    /// table. Exactly one pop happens on either branch.
    pub(crate) async fn on_patient_rules(
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

        let user = self
            .session
            .user
            .clone()
            .ok_or(TurnError::CorruptSession)?;
        let submission = AnswerSubmission {
            user,
            answers: self.session.answers.clone(),
        };

        match self.api.submit_answers(&submission).await {
            Ok(diagnosis) => {
                self.say("Your answers have been stored.");
                self.show_diagnosis("Diagnosis:", &diagnosis);
            }
            Err(err) => {
                tracing::warn!(error = %err, "submission failed; using the local rule table");
                self.warn_user(&format!("Could not store your answers: {err}."));
                let local = self.local_diagnosis(RuleSet::Patient);
                self.show_diagnosis("Diagnosis (local, service unavailable):", &local);
            }
        }

        self.pop(true).await;
        Ok(None)
    }

    pub(crate) async fn on_patient_progress_menu(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        match input.to_lowercase().as_str() {
            "1" | "note" | "progress" | "nota" | "progreso" => {
                self.push(StateKind::PatientProgress, false).await;
            }
            "2" | "history" | "historial" => {
                self.push(StateKind::PatientHistory, false).await;
            }
            "3" | "back" | "volver" | "atras" | "atrás" => {
                self.pop(false).await;
            }
            _ => {
                self.warn_user(&format!("Invalid option. Choose:\n{PROGRESS_MENU_OPTIONS}"));
            }
        }
        Ok(None)
    }

    /// Free-text progress note; recorded remotely, then the flow ends.
    pub(crate) async fn on_patient_progress(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let id = self
            .session
            .user
            .as_ref()
            .map(|user| user.identification().clone())
            .ok_or(TurnError::CorruptSession)?;

        match self.api.submit_progress_note(&id, input).await {
            Ok(()) => self.say("Progress recorded in your history."),
            Err(err) => {
                tracing::warn!(error = %err, "progress note failed");
                self.warn_user(&format!("Could not record your progress: {err}."));
            }
        }

        self.pop(true).await;
        Ok(None)
    }

    pub(crate) async fn on_patient_history(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let only_last = match input.to_lowercase().as_str() {
            "1" | "full" | "full history" | "completo" => false,
            "2" | "latest" | "last" | "ultimo" | "último" => true,
            "3" | "back" | "volver" | "atras" | "atrás" => {
                self.pop(false).await;
                return Ok(None);
            }
            _ => {
                self.warn_user(&format!("Invalid option. Choose:\n{HISTORY_OPTIONS}"));
                return Ok(None);
            }
        };

        let id = self
            .session
            .user
            .as_ref()
            .map(|user| user.identification().clone())
            .ok_or(TurnError::CorruptSession)?;

        self.render_history(&id, only_last).await;
        self.pop(true).await;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{patient_engine, signed_in};
    use gateway::Endpoint;
    use vital_core::model::{Diagnosis, HistoryEntry, PatientId};

    #[tokio::test]
    async fn questionnaire_accumulator_is_bounded_by_the_question_count() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("1").await;
        assert_eq!(h.engine.session().active(), StateKind::PatientRules);
        let total = h.engine.session().questions().len();
        assert_eq!(total, 5);

        for k in 1..=4 {
            h.engine.handle("no").await;
            assert_eq!(h.engine.session().answers().len(), k.min(total));
        }
        // Invalid answers must not grow the accumulator.
        h.engine.handle("perhaps").await;
        assert_eq!(h.engine.session().answers().len(), 4);
    }

    #[tokio::test]
    async fn spanish_synonyms_open_the_questionnaire() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("sistema de reglas").await;
        assert_eq!(h.engine.session().active(), StateKind::PatientRules);
    }

    #[tokio::test]
    async fn completed_questionnaire_shows_the_server_diagnosis_and_pops_once() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        let menu_depth = h.engine.session().depth();

        h.engine.handle("1").await;
        for _ in 0..4 {
            h.engine.handle("no").await;
        }
        h.engine.handle("yes").await; // dizziness

        assert!(h.sink.saw("Your answers have been stored."));
        assert!(h.sink.saw("possible blood-pressure/dehydration issue"));
        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
    }

    #[tokio::test]
    async fn failed_submission_falls_back_to_the_local_rule_table() {
        let mut h = patient_engine();
        h.api.set_questions(crate::testing::three_questions());
        signed_in(&mut h, "ana 1234").await;
        let menu_depth = h.engine.session().depth();
        h.api.set_outage(Endpoint::Submit, true);

        h.engine.handle("1").await;
        h.engine.handle("no").await;
        h.engine.handle("no").await;
        h.engine.handle("no").await;

        assert!(h.sink.saw("Could not store your answers"));
        assert!(h.sink.saw("Diagnosis (local, service unavailable):"));
        assert!(h.sink.saw("mild symptoms, rest and observe"));
        // Exactly one pop: back at the menu, not past it.
        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
    }

    #[tokio::test]
    async fn question_fetch_outage_restores_the_menu() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        let menu_depth = h.engine.session().depth();
        h.api.set_outage(Endpoint::Questions, true);

        h.engine.handle("1").await;

        assert!(h.sink.saw("Could not open this option"));
        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
        assert_eq!(h.engine.session().depth(), menu_depth);
    }

    #[tokio::test]
    async fn empty_question_list_is_treated_as_a_failed_entry() {
        let mut h = patient_engine();
        h.api.set_questions(Vec::new());
        signed_in(&mut h, "ana 1234").await;

        h.engine.handle("1").await;

        assert!(h.sink.saw("no questions"));
        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
    }

    #[tokio::test]
    async fn progress_note_is_recorded_and_the_flow_pops() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("2").await;
        assert_eq!(h.engine.session().active(), StateKind::PatientProgressMenu);

        h.engine.handle("1").await;
        h.engine.handle("Feeling much better after the new medication").await;

        assert!(h.sink.saw("Progress recorded in your history."));
        assert_eq!(h.engine.session().active(), StateKind::PatientProgressMenu);

        let id = PatientId::new("1002003004").unwrap();
        let notes = h.api.notes_for(&id);
        assert_eq!(notes, vec!["Feeling much better after the new medication"]);
    }

    #[tokio::test]
    async fn progress_outage_still_ends_the_flow() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.api.set_outage(Endpoint::Progress, true);

        h.engine.handle("2").await;
        h.engine.handle("1").await;
        h.engine.handle("Some update").await;

        assert!(h.sink.saw("Could not record your progress"));
        assert_eq!(h.engine.session().active(), StateKind::PatientProgressMenu);
    }

    #[tokio::test]
    async fn history_listing_renders_bullets_and_a_terminator() {
        let mut h = patient_engine();
        let id = PatientId::new("1002003004").unwrap();
        h.api.add_history(
            id.clone(),
            HistoryEntry::new("10/08/2025", Diagnosis::text("mild symptoms, rest and observe")),
        );
        h.api.add_history(
            id,
            HistoryEntry::new("12/09/2025", Diagnosis::text("possible heart failure/arrhythmia, consult a doctor")),
        );
        signed_in(&mut h, "ana 1234").await;

        h.engine.handle("2").await;
        h.engine.handle("2").await; // history lookup
        h.engine.handle("1").await; // full history

        assert!(h.sink.saw("• 10/08/2025"));
        assert!(h.sink.saw("• 12/09/2025"));
        assert!(h.sink.saw("End of history."));
        assert_eq!(h.engine.session().active(), StateKind::PatientProgressMenu);
    }

    #[tokio::test]
    async fn latest_entry_lookup_shows_only_the_newest_consultation() {
        let mut h = patient_engine();
        let id = PatientId::new("1002003004").unwrap();
        h.api.add_history(id.clone(), HistoryEntry::new("10/08/2025", Diagnosis::text("old")));
        h.api.add_history(id, HistoryEntry::new("12/09/2025", Diagnosis::text("new")));
        signed_in(&mut h, "ana 1234").await;

        h.engine.handle("2").await;
        h.engine.handle("2").await;
        h.engine.handle("2").await; // latest only

        assert!(!h.sink.saw("• 10/08/2025"));
        assert!(h.sink.saw("• 12/09/2025"));
    }

    #[tokio::test]
    async fn going_back_restates_the_parent_menu() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("2").await;

        let before = h.sink.message_count();
        h.engine.handle("volver").await;

        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
        // A loud pop restates the patient menu options.
        assert!(h.sink.texts()[before..].iter().any(|t| t == PATIENT_MENU_OPTIONS));
    }
}
