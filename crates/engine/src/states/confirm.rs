use crate::engine::{ChatEngine, PendingAction};
use crate::error::TurnError;
use crate::states::{INVALID_YES_NO, parse_yes_no};

impl ChatEngine {
    /// Sign-out confirmation. Yes ends the session with a role-aware
    /// farewell; No returns to the menu that asked.
    pub(crate) async fn on_exit_confirm(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        match parse_yes_no(input) {
            Some(true) => {
                let farewell = match &self.session.user {
                    Some(user) => format!(
                        "Thank you for using our services, {}{}.",
                        user.role().honorific(),
                        user.name()
                    ),
                    None => "Signing out...".to_string(),
                };
                self.say(&farewell);
                self.reset(true);
                Ok(Some(PendingAction::SessionReset))
            }
            Some(false) => {
                self.pop(false).await;
                Ok(None)
            }
            None => {
                self.warn_user(INVALID_YES_NO);
                Ok(None)
            }
        }
    }

    /// The inverse prompt: Yes goes back one level, No ends the session.
    pub(crate) async fn on_return_prompt(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        match parse_yes_no(input) {
            Some(true) => {
                self.pop(false).await;
                Ok(None)
            }
            Some(false) => {
                self.say("Signing out...");
                self.reset(true);
                Ok(Some(PendingAction::SessionReset))
            }
            None => {
                self.warn_user(INVALID_YES_NO);
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::PendingAction;
    use crate::session::StateKind;
    use crate::states::DOCTOR_MENU_OPTIONS;
    use crate::testing::{clinician_engine, patient_engine, signed_in};

    #[tokio::test]
    async fn confirmed_sign_out_resets_and_clears_the_transcript() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.engine.handle("4").await;
        assert_eq!(h.engine.session().active(), StateKind::ExitConfirm);

        let action = h.engine.handle("yes").await;

        assert_eq!(action, Some(PendingAction::SessionReset));
        assert!(h.sink.saw("Thank you for using our services, Dr. Mario."));
        assert_eq!(h.engine.session().active(), StateKind::Initial);
        assert_eq!(h.engine.session().depth(), 0);
        assert!(h.engine.session().user().is_none());
        assert!(h.sink.transcript_cleared());
    }

    #[tokio::test]
    async fn patient_farewell_has_no_honorific() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("3").await;
        h.engine.handle("sí").await;

        assert!(h.sink.saw("Thank you for using our services, Ana."));
    }

    #[tokio::test]
    async fn declining_the_sign_out_restates_the_menu() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        h.engine.handle("4").await;

        let before = h.sink.message_count();
        let action = h.engine.handle("no").await;

        assert_eq!(action, None);
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
        assert!(
            h.sink.texts()[before..]
                .iter()
                .any(|t| t == DOCTOR_MENU_OPTIONS)
        );
    }

    #[tokio::test]
    async fn return_prompt_goes_back_without_restating_a_silent_parent() {
        let mut h = patient_engine();
        h.engine.handle("ana 1234").await;
        h.engine.handle("no").await; // pushed silently with an inline question
        assert_eq!(h.engine.session().active(), StateKind::ReturnPrompt);

        let before = h.sink.message_count();
        h.engine.handle("yes").await;

        assert_eq!(h.engine.session().active(), StateKind::LoginOptions);
        // The push was silent, so the pop must not restate the welcome.
        assert_eq!(h.sink.message_count(), before);
    }

    #[tokio::test]
    async fn return_prompt_no_ends_the_session() {
        let mut h = patient_engine();
        h.engine.handle("ana 1234").await;
        h.engine.handle("no").await;

        let action = h.engine.handle("no").await;

        assert_eq!(action, Some(PendingAction::SessionReset));
        assert!(h.sink.saw("Signing out..."));
        assert_eq!(h.engine.session().active(), StateKind::Initial);
        assert_eq!(h.engine.session().depth(), 0);
    }

    #[tokio::test]
    async fn unknown_answer_reprompts_the_same_question() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        h.engine.handle("3").await;

        h.engine.handle("whatever").await;

        assert_eq!(h.engine.session().active(), StateKind::ExitConfirm);
        assert!(h.sink.saw("Please answer Yes or No"));
    }
}
