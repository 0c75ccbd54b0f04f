use std::collections::BTreeSet;

use vital_core::model::{Answer, PatientId, Question, User};

//
// ─── STATES ────────────────────────────────────────────────────────────────────
//

/// One step of the conversation. Every variant is a data-free tag: per-step
/// data lives on the [`Session`], so states can be reconstructed freely on
/// push and pop without losing anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Initial,
    LoginOptions,
    PatientMenu,
    PatientRules,
    PatientProgressMenu,
    PatientProgress,
    PatientHistory,
    DoctorMenu,
    DoctorRules,
    DoctorFollowUp,
    DoctorReport,
    ExitConfirm,
    ReturnPrompt,
}

/// A state saved on the navigation stack, remembering whether its push was
/// silent. Both the pop-time flag and this push-time flag must be false for
/// the restored state to restate its welcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackEntry {
    pub state: StateKind,
    pub silent: bool,
}

//
// ─── REPORT WIZARD ─────────────────────────────────────────────────────────────
//

/// Stage of the two-step report flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStage {
    AwaitingIds,
    AwaitingEmail,
}

/// Accumulated report-flow state. Lives on the session (not on the state
/// tag) so it survives across turns without stack churn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWizard {
    stage: WizardStage,
    patient_ids: BTreeSet<PatientId>,
}

impl ReportWizard {
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: WizardStage::AwaitingIds,
            patient_ids: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    #[must_use]
    pub fn patient_ids(&self) -> &BTreeSet<PatientId> {
        &self.patient_ids
    }

    /// Stores the validated id list and advances to the email stage.
    pub fn accept_ids(&mut self, ids: BTreeSet<PatientId>) {
        self.patient_ids = ids;
        self.stage = WizardStage::AwaitingEmail;
    }
}

impl Default for ReportWizard {
    fn default() -> Self {
        Self::new()
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Single source of mutable truth for one user's interaction. Owned by the
/// engine for the lifetime of the conversation and wiped on logout or
/// defensive recovery.
#[derive(Debug)]
pub struct Session {
    pub(crate) user: Option<User>,
    pub(crate) stack: Vec<StackEntry>,
    pub(crate) active: StateKind,
    pub(crate) questions: Vec<Question>,
    pub(crate) answers: Vec<Answer>,
    pub(crate) report: Option<ReportWizard>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            user: None,
            stack: Vec::new(),
            active: StateKind::Initial,
            questions: Vec::new(),
            answers: Vec::new(),
            report: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn active(&self) -> StateKind {
        self.active
    }

    /// Current navigation depth (number of stacked parent states).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn report(&self) -> Option<&ReportWizard> {
        self.report.as_ref()
    }

    /// Installs a freshly fetched questionnaire and clears the accumulator.
    pub(crate) fn begin_questionnaire(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.answers.clear();
    }

    /// The next unanswered question, with its zero-based position.
    #[must_use]
    pub(crate) fn next_question(&self) -> Option<(usize, &Question)> {
        let index = self.answers.len();
        self.questions.get(index).map(|question| (index, question))
    }

    /// Appends an answer. Never grows past the question list.
    pub(crate) fn record_answer(&mut self, answer: Answer) {
        if self.answers.len() < self.questions.len() {
            self.answers.push(answer);
        }
    }

    #[must_use]
    pub(crate) fn questionnaire_complete(&self) -> bool {
        !self.questions.is_empty() && self.answers.len() == self.questions.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vital_core::model::QuestionId;

    fn three_questions() -> Vec<Question> {
        (1..=3)
            .map(|i| Question::new(QuestionId::new(i), format!("Question {i}?")))
            .collect()
    }

    #[test]
    fn new_session_starts_at_initial_with_empty_stack() {
        let session = Session::new();
        assert_eq!(session.active(), StateKind::Initial);
        assert_eq!(session.depth(), 0);
        assert!(session.user().is_none());
    }

    #[test]
    fn questionnaire_entry_clears_previous_answers() {
        let mut session = Session::new();
        session.begin_questionnaire(three_questions());
        session.record_answer(Answer::new(QuestionId::new(1), true));
        assert_eq!(session.answers().len(), 1);

        session.begin_questionnaire(three_questions());
        assert!(session.answers().is_empty());
    }

    #[test]
    fn answers_never_outgrow_questions() {
        let mut session = Session::new();
        session.begin_questionnaire(three_questions());
        for _ in 0..5 {
            session.record_answer(Answer::new(QuestionId::new(1), false));
        }
        assert_eq!(session.answers().len(), 3);
        assert!(session.questionnaire_complete());
    }

    #[test]
    fn next_question_tracks_the_accumulator() {
        let mut session = Session::new();
        session.begin_questionnaire(three_questions());
        let (index, question) = session.next_question().unwrap();
        assert_eq!(index, 0);
        assert_eq!(question.prompt(), "Question 1?");

        session.record_answer(Answer::new(QuestionId::new(1), true));
        let (index, _) = session.next_question().unwrap();
        assert_eq!(index, 1);
    }

    #[test]
    fn empty_questionnaire_is_never_complete() {
        let session = Session::new();
        assert!(!session.questionnaire_complete());
    }

    #[test]
    fn wizard_retains_ids_when_advancing_stage() {
        let mut wizard = ReportWizard::new();
        assert_eq!(wizard.stage(), WizardStage::AwaitingIds);

        let ids: BTreeSet<PatientId> = ["123", "456"]
            .iter()
            .map(|raw| PatientId::new(*raw).unwrap())
            .collect();
        wizard.accept_ids(ids);
        assert_eq!(wizard.stage(), WizardStage::AwaitingEmail);
        assert_eq!(wizard.patient_ids().len(), 2);
    }
}
