use crate::model::ids::QuestionId;

/// One yes/no diagnostic question. Fetched once per questionnaire entry and
/// immutable for that entry's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    prompt: String,
}

impl Question {
    #[must_use]
    pub fn new(id: QuestionId, prompt: impl Into<String>) -> Self {
        Self {
            id,
            prompt: prompt.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// A single answered question. Appended one at a time; never more answers
/// than questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Answer {
    question_id: QuestionId,
    value: bool,
}

impl Answer {
    #[must_use]
    pub fn new(question_id: QuestionId, value: bool) -> Self {
        Self { question_id, value }
    }

    #[must_use]
    pub fn question_id(&self) -> QuestionId {
        self.question_id
    }

    #[must_use]
    pub fn value(&self) -> bool {
        self.value
    }
}
