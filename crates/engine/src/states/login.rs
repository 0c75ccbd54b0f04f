use vital_core::model::Role;

use crate::engine::{ChatEngine, PendingAction};
use crate::error::TurnError;
use crate::session::StateKind;
use crate::states::{INVALID_YES_NO, parse_yes_no};

impl ChatEngine {
    pub(crate) fn welcome_login_options(&mut self) -> Result<(), TurnError> {
        let user = self.session.user.as_ref().ok_or(TurnError::CorruptSession)?;
        let line = format!(
            "Welcome, {}! You are signed in as a {}. Do you want to use the system features? (Yes/No)",
            user.name(),
            user.role()
        );
        self.say(&line);
        Ok(())
    }

    /// Sign-in: expects `<username> <password>` as two whitespace-separated
    /// tokens. Failures of any kind re-prompt without touching the stack.
    pub(crate) async fn on_initial(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let mut parts = input.split_whitespace();
        let (Some(username), Some(password), None) = (parts.next(), parts.next(), parts.next())
        else {
            self.warn_user(
                "Please enter your username and password separated by a space. Try again.",
            );
            return Ok(None);
        };

        match self.api.login(username, password).await {
            Ok(user) => {
                tracing::info!(role = %user.role(), "sign-in accepted");
                self.session.user = Some(user);
                self.push(StateKind::LoginOptions, false).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "sign-in failed");
                self.warn_user(&format!("Sign-in failed: {err}. Try again."));
            }
        }
        Ok(None)
    }

    /// Post-login branch: the role decides which main menu opens.
    pub(crate) async fn on_login_options(
        &mut self,
        input: &str,
    ) -> Result<Option<PendingAction>, TurnError> {
        let role = self
            .session
            .user
            .as_ref()
            .map(|user| user.role())
            .ok_or(TurnError::CorruptSession)?;

        match parse_yes_no(input) {
            Some(true) => match role {
                Role::Patient => self.push(StateKind::PatientMenu, false).await,
                Role::Clinician => self.push(StateKind::DoctorMenu, false).await,
            },
            Some(false) => {
                self.say("You have chosen not to use the system features. Do you want to go back? (Yes/No)");
                self.push(StateKind::ReturnPrompt, true).await;
            }
            None => self.warn_user(INVALID_YES_NO),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::StateKind;
    use crate::sink::MessageKind;
    use crate::testing::{clinician_engine, patient_engine, signed_in};
    use gateway::Endpoint;

    #[tokio::test]
    async fn free_text_without_credentials_shape_is_rejected() {
        let mut h = patient_engine();
        let before_depth = h.engine.session().depth();

        h.engine.handle("hello there how are you").await;

        assert_eq!(h.engine.session().active(), StateKind::Initial);
        assert_eq!(h.engine.session().depth(), before_depth);
        assert_eq!(h.sink.last_kind(), MessageKind::Error);
        assert!(h.sink.saw("username and password"));
    }

    #[tokio::test]
    async fn successful_login_pushes_login_options() {
        let mut h = patient_engine();
        h.engine.handle("ana 1234").await;

        assert_eq!(h.engine.session().active(), StateKind::LoginOptions);
        assert_eq!(h.engine.session().depth(), 1);
        assert!(h.sink.saw("Welcome, Ana!"));
        assert!(h.sink.saw("signed in as a patient"));
    }

    #[tokio::test]
    async fn rejected_credentials_stay_at_initial() {
        let mut h = patient_engine();
        h.engine.handle("ana wrong-password").await;

        assert_eq!(h.engine.session().active(), StateKind::Initial);
        assert_eq!(h.engine.session().depth(), 0);
        assert!(h.sink.saw("Sign-in failed"));
        assert!(h.engine.session().user().is_none());
    }

    #[tokio::test]
    async fn login_outage_is_surfaced_without_state_change() {
        let mut h = patient_engine();
        h.api.set_outage(Endpoint::Login, true);

        h.engine.handle("ana 1234").await;

        assert_eq!(h.engine.session().active(), StateKind::Initial);
        assert!(h.sink.saw("service unavailable"));
    }

    #[tokio::test]
    async fn patient_role_branches_to_the_patient_menu() {
        let mut h = patient_engine();
        signed_in(&mut h, "ana 1234").await;
        assert_eq!(h.engine.session().active(), StateKind::PatientMenu);
    }

    #[tokio::test]
    async fn clinician_role_branches_to_the_doctor_menu() {
        let mut h = clinician_engine();
        signed_in(&mut h, "mario 5678").await;
        assert_eq!(h.engine.session().active(), StateKind::DoctorMenu);
    }

    #[tokio::test]
    async fn declining_the_features_asks_to_go_back() {
        let mut h = patient_engine();
        h.engine.handle("ana 1234").await;
        h.engine.handle("no").await;

        assert_eq!(h.engine.session().active(), StateKind::ReturnPrompt);
        assert!(h.sink.saw("Do you want to go back?"));
    }

    #[tokio::test]
    async fn gibberish_at_login_options_reprompts() {
        let mut h = patient_engine();
        h.engine.handle("ana 1234").await;
        h.engine.handle("maybe").await;

        assert_eq!(h.engine.session().active(), StateKind::LoginOptions);
        assert!(h.sink.saw("Please answer Yes or No"));
    }
}
