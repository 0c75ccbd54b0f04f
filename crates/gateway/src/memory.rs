use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use vital_core::Clock;
use vital_core::model::{
    Answer, Diagnosis, HistoryEntry, PatientId, Question, QuestionId, Role, User,
};
use vital_core::rules::RuleSet;

use crate::api::{AnswerSubmission, GatewayError, HealthApi};

/// Endpoints that can be toggled into an outage for tests and demos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Login,
    Questions,
    Submit,
    Progress,
    History,
}

struct Account {
    username: String,
    password: String,
    user: User,
}

/// In-memory stand-in for the remote assessment service, used by tests and
/// the app's offline mode. Diagnoses are produced with the same rule tables
/// the engine uses as a fallback, so offline behavior matches the degraded
/// online path.
pub struct InMemoryApi {
    clock: Clock,
    accounts: Mutex<Vec<Account>>,
    questions: Mutex<Vec<Question>>,
    history: Mutex<HashMap<PatientId, Vec<HistoryEntry>>>,
    notes: Mutex<HashMap<PatientId, Vec<String>>>,
    outages: Mutex<HashSet<Endpoint>>,
}

impl InMemoryApi {
    #[must_use]
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            accounts: Mutex::new(Vec::new()),
            questions: Mutex::new(Vec::new()),
            history: Mutex::new(HashMap::new()),
            notes: Mutex::new(HashMap::new()),
            outages: Mutex::new(HashSet::new()),
        }
    }

    /// Builds the adapter with demo accounts and the cardiovascular
    /// questionnaire.
    ///
    /// # Errors
    ///
    /// Returns `vital_core::Error` if the seeded profiles fail validation.
    pub fn demo(clock: Clock) -> Result<Self, vital_core::Error> {
        let api = Self::new(clock);
        api.add_account(
            "ana",
            "1234",
            User::new(
                "Ana",
                "Torres",
                PatientId::new("1002003004")?,
                34,
                "femenino",
                Role::Patient,
            )?,
        );
        api.add_account(
            "mario",
            "5678",
            User::new(
                "Mario",
                "Reyes",
                PatientId::new("1000000001")?,
                45,
                "masculino",
                Role::Clinician,
            )?,
        );
        api.set_questions(vec![
            Question::new(QuestionId::new(1), "Do you have chest pain?"),
            Question::new(QuestionId::new(2), "Do you experience shortness of breath?"),
            Question::new(QuestionId::new(3), "Do you have swelling in your legs or ankles?"),
            Question::new(QuestionId::new(4), "Do you feel palpitations?"),
            Question::new(QuestionId::new(5), "Do you feel dizzy or lightheaded?"),
        ]);
        Ok(api)
    }

    pub fn add_account(&self, username: &str, password: &str, user: User) {
        let mut accounts = self.accounts.lock().unwrap_or_else(|e| e.into_inner());
        accounts.push(Account {
            username: username.to_string(),
            password: password.to_string(),
            user,
        });
    }

    pub fn set_questions(&self, questions: Vec<Question>) {
        let mut guard = self.questions.lock().unwrap_or_else(|e| e.into_inner());
        *guard = questions;
    }

    pub fn add_history(&self, id: PatientId, entry: HistoryEntry) {
        let mut history = self.history.lock().unwrap_or_else(|e| e.into_inner());
        history.entry(id).or_default().push(entry);
    }

    /// Puts an endpoint into (or out of) a simulated outage.
    pub fn set_outage(&self, endpoint: Endpoint, down: bool) {
        let mut outages = self.outages.lock().unwrap_or_else(|e| e.into_inner());
        if down {
            outages.insert(endpoint);
        } else {
            outages.remove(&endpoint);
        }
    }

    /// Progress notes recorded so far for an identification.
    #[must_use]
    pub fn notes_for(&self, id: &PatientId) -> Vec<String> {
        let notes = self.notes.lock().unwrap_or_else(|e| e.into_inner());
        notes.get(id).cloned().unwrap_or_default()
    }

    fn check(&self, endpoint: Endpoint) -> Result<(), GatewayError> {
        let outages = self
            .outages
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        if outages.contains(&endpoint) {
            Err(GatewayError::Unavailable)
        } else {
            Ok(())
        }
    }

    fn today(&self) -> String {
        self.clock.now().format("%d/%m/%Y").to_string()
    }
}

#[async_trait]
impl HealthApi for InMemoryApi {
    async fn login(&self, username: &str, password: &str) -> Result<User, GatewayError> {
        self.check(Endpoint::Login)?;
        let accounts = self
            .accounts
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        accounts
            .iter()
            .find(|account| account.username == username && account.password == password)
            .map(|account| account.user.clone())
            .ok_or_else(|| GatewayError::Rejected("invalid username or password".into()))
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, GatewayError> {
        self.check(Endpoint::Questions)?;
        let questions = self
            .questions
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        Ok(questions.clone())
    }

    async fn submit_answers(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<Diagnosis, GatewayError> {
        self.check(Endpoint::Submit)?;
        let values: Vec<bool> = submission.answers.iter().map(Answer::value).collect();
        let diagnosis = Diagnosis::text(RuleSet::Patient.evaluate(&values));
        let mut history = self
            .history
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        history
            .entry(submission.user.identification().clone())
            .or_default()
            .push(HistoryEntry::new(self.today(), diagnosis.clone()));
        Ok(diagnosis)
    }

    async fn submit_answers_unsaved(
        &self,
        answers: &[Answer],
    ) -> Result<Diagnosis, GatewayError> {
        self.check(Endpoint::Submit)?;
        let values: Vec<bool> = answers.iter().map(Answer::value).collect();
        Ok(Diagnosis::text(RuleSet::Clinician.evaluate(&values)))
    }

    async fn submit_progress_note(
        &self,
        id: &PatientId,
        note: &str,
    ) -> Result<(), GatewayError> {
        self.check(Endpoint::Progress)?;
        let mut notes = self
            .notes
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        notes.entry(id.clone()).or_default().push(note.to_string());
        Ok(())
    }

    async fn fetch_history(
        &self,
        id: &PatientId,
        only_last: bool,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        self.check(Endpoint::History)?;
        let history = self
            .history
            .lock()
            .map_err(|e| GatewayError::Internal(e.to_string()))?;
        let entries = history.get(id).cloned().unwrap_or_default();
        if only_last {
            Ok(entries.into_iter().next_back().into_iter().collect())
        } else {
            Ok(entries)
        }
    }
}
