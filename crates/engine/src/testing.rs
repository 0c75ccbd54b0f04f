//! In-memory doubles and fixtures shared by the engine tests.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use gateway::{InMemoryApi, ReportDelivery, ReportError};
use vital_core::model::{PatientId, Question, QuestionId};
use vital_core::time::fixed_clock;

use crate::engine::ChatEngine;
use crate::sink::{MessageKind, MessageSink};

//
// ─── RECORDING SINK ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
pub(crate) struct PostedMessage {
    pub text: String,
    pub kind: MessageKind,
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    messages: Mutex<Vec<PostedMessage>>,
    cleared: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn texts(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    /// True when any posted message contains the needle.
    pub fn saw(&self, needle: &str) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| m.text.contains(needle))
    }

    pub fn last_kind(&self) -> MessageKind {
        self.messages
            .lock()
            .unwrap()
            .last()
            .expect("no messages posted")
            .kind
    }

    pub fn transcript_cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }
}

impl MessageSink for RecordingSink {
    fn post(&self, text: &str, _from_user: bool, kind: MessageKind) {
        self.messages.lock().unwrap().push(PostedMessage {
            text: text.to_string(),
            kind,
        });
    }

    fn clear_transcript(&self) {
        self.cleared.store(true, Ordering::SeqCst);
    }
}

//
// ─── RECORDING REPORT DELIVERY ─────────────────────────────────────────────────
//

#[derive(Default)]
pub(crate) struct RecordingReports {
    generated: Mutex<Vec<Vec<PatientId>>>,
    sent: Mutex<Vec<String>>,
    fail_send: AtomicBool,
}

impl RecordingReports {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn generated_calls(&self) -> usize {
        self.generated.lock().unwrap().len()
    }

    pub fn sent_calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn fail_sending(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ReportDelivery for RecordingReports {
    async fn generate_report(
        &self,
        patients: &[PatientId],
    ) -> Result<Vec<PathBuf>, ReportError> {
        self.generated.lock().unwrap().push(patients.to_vec());
        Ok(patients
            .iter()
            .map(|id| PathBuf::from(format!("report_{id}.txt")))
            .collect())
    }

    async fn send_report(&self, email: &str, _files: &[PathBuf]) -> Result<(), ReportError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(ReportError::Io(std::io::Error::other(
                "simulated delivery failure",
            )));
        }
        self.sent.lock().unwrap().push(email.to_string());
        Ok(())
    }
}

//
// ─── HARNESS ───────────────────────────────────────────────────────────────────
//

pub(crate) struct EngineHarness {
    pub engine: ChatEngine,
    pub sink: Arc<RecordingSink>,
    pub api: Arc<InMemoryApi>,
    pub reports: Arc<RecordingReports>,
}

fn harness() -> EngineHarness {
    let api = Arc::new(InMemoryApi::demo(fixed_clock()).expect("demo data should be valid"));
    let sink = RecordingSink::new();
    let reports = RecordingReports::new();
    let engine = ChatEngine::new(
        Arc::clone(&api) as Arc<dyn gateway::HealthApi>,
        Arc::clone(&reports) as Arc<dyn ReportDelivery>,
        Arc::clone(&sink) as Arc<dyn MessageSink>,
    );
    EngineHarness {
        engine,
        sink,
        api,
        reports,
    }
}

/// Harness seeded with the demo patient account (`ana` / `1234`).
pub(crate) fn patient_engine() -> EngineHarness {
    harness()
}

/// Harness seeded with the demo clinician account (`mario` / `5678`).
pub(crate) fn clinician_engine() -> EngineHarness {
    harness()
}

/// Signs in with the given credentials and accepts the feature prompt,
/// landing on the role's main menu.
pub(crate) async fn signed_in(h: &mut EngineHarness, credentials: &str) {
    h.engine.handle(credentials).await;
    h.engine.handle("yes").await;
}

/// A minimal three-question questionnaire for short flows.
pub(crate) fn three_questions() -> Vec<Question> {
    vec![
        Question::new(QuestionId::new(1), "Do you have chest pain?"),
        Question::new(QuestionId::new(2), "Do you experience shortness of breath?"),
        Question::new(QuestionId::new(3), "Do you have swelling in your legs or ankles?"),
    ]
}
