use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use vital_core::Clock;
use vital_core::model::{HistoryEntry, PatientId};

use crate::api::{GatewayError, HealthApi};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("no report files to send")]
    Empty,

    #[error("report file has no usable name: {0}")]
    InvalidPath(PathBuf),
}

//
// ─── CONTRACT ──────────────────────────────────────────────────────────────────
//

/// Report generation and delivery, consumed by the report wizard as a black
/// box. The production renderer and the mail transport live behind this
/// seam.
#[async_trait]
pub trait ReportDelivery: Send + Sync {
    /// Render one report file per patient and return the file paths.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if patient data cannot be fetched or a file
    /// cannot be written.
    async fn generate_report(&self, patients: &[PatientId])
    -> Result<Vec<PathBuf>, ReportError>;

    /// Hand the generated files to the delivery channel.
    ///
    /// # Errors
    ///
    /// Returns `ReportError` if there is nothing to send or the handoff
    /// fails.
    async fn send_report(&self, email: &str, files: &[PathBuf]) -> Result<(), ReportError>;
}

//
// ─── FILE-BASED DELIVERY ───────────────────────────────────────────────────────
//

/// Renders plain-text reports from gateway history and "sends" them by
/// spooling into an outbox directory. Mail transport proper is out of scope;
/// anything watching the outbox can pick the files up.
pub struct FileReportDelivery {
    api: Arc<dyn HealthApi>,
    out_dir: PathBuf,
    clock: Clock,
}

impl FileReportDelivery {
    #[must_use]
    pub fn new(api: Arc<dyn HealthApi>, out_dir: impl Into<PathBuf>, clock: Clock) -> Self {
        Self {
            api,
            out_dir: out_dir.into(),
            clock,
        }
    }

    fn render(&self, id: &PatientId, history: &[HistoryEntry]) -> String {
        let mut body = String::new();
        let _ = writeln!(body, "Patient Health Report");
        let _ = writeln!(body, "=====================");
        let _ = writeln!(body, "Identification: {id}");
        let _ = writeln!(
            body,
            "Generated: {}",
            self.clock.now().format("%Y-%m-%d %H:%M UTC")
        );
        let _ = writeln!(body);
        let _ = writeln!(body, "Diagnoses");
        let _ = writeln!(body, "---------");
        if history.is_empty() {
            let _ = writeln!(body, "No diagnoses on record.");
        } else {
            for entry in history {
                let mut lines = entry.diagnosis().display_lines().into_iter();
                let first = lines.next().unwrap_or_default();
                let _ = writeln!(body, "- {}: {first}", entry.date());
                for line in lines {
                    let _ = writeln!(body, "  {line}");
                }
            }
        }
        let _ = writeln!(body);
        let _ = writeln!(body, "We wish you a prompt recovery.");
        body
    }
}

#[async_trait]
impl ReportDelivery for FileReportDelivery {
    async fn generate_report(
        &self,
        patients: &[PatientId],
    ) -> Result<Vec<PathBuf>, ReportError> {
        fs::create_dir_all(&self.out_dir)?;

        let mut files = Vec::with_capacity(patients.len());
        for id in patients {
            let history = self.api.fetch_history(id, false).await?;
            let path = self.out_dir.join(format!("report_{id}.txt"));
            fs::write(&path, self.render(id, &history))?;
            files.push(path);
        }
        Ok(files)
    }

    async fn send_report(&self, email: &str, files: &[PathBuf]) -> Result<(), ReportError> {
        if files.is_empty() {
            return Err(ReportError::Empty);
        }

        let outbox = self.out_dir.join("outbox");
        fs::create_dir_all(&outbox)?;
        for file in files {
            let name = file
                .file_name()
                .ok_or_else(|| ReportError::InvalidPath(file.clone()))?;
            let _ = fs::copy(file, outbox.join(name))?;
        }

        tracing::info!(recipient = email, files = files.len(), "report spooled to outbox");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryApi;
    use vital_core::model::Diagnosis;
    use vital_core::time::fixed_clock;

    fn delivery_with_history(dir: &Path) -> (FileReportDelivery, PatientId) {
        let api = Arc::new(InMemoryApi::demo(fixed_clock()).unwrap());
        let id = PatientId::new("1002003004").unwrap();
        api.add_history(
            id.clone(),
            HistoryEntry::new("12/09/2025", Diagnosis::text("mild symptoms, rest and observe")),
        );
        (FileReportDelivery::new(api, dir, fixed_clock()), id)
    }

    #[tokio::test]
    async fn generates_one_file_per_patient() {
        let dir = tempfile::tempdir().unwrap();
        let (delivery, id) = delivery_with_history(dir.path());

        let files = delivery.generate_report(&[id]).await.unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("report_1002003004.txt"));

        let body = fs::read_to_string(&files[0]).unwrap();
        assert!(body.contains("Identification: 1002003004"));
        assert!(body.contains("12/09/2025: mild symptoms, rest and observe"));
        assert!(body.contains("Generated: 2023-11-14"));
    }

    #[tokio::test]
    async fn empty_history_still_produces_a_report() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(InMemoryApi::demo(fixed_clock()).unwrap());
        let delivery = FileReportDelivery::new(api, dir.path(), fixed_clock());
        let id = PatientId::new("9999").unwrap();

        let files = delivery.generate_report(&[id]).await.unwrap();
        let body = fs::read_to_string(&files[0]).unwrap();
        assert!(body.contains("No diagnoses on record."));
    }

    #[tokio::test]
    async fn send_spools_files_into_the_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let (delivery, id) = delivery_with_history(dir.path());

        let files = delivery.generate_report(&[id]).await.unwrap();
        delivery.send_report("doc@example.com", &files).await.unwrap();

        let spooled = dir.path().join("outbox").join("report_1002003004.txt");
        assert!(spooled.exists());
    }

    #[tokio::test]
    async fn send_rejects_an_empty_file_list() {
        let dir = tempfile::tempdir().unwrap();
        let (delivery, _) = delivery_with_history(dir.path());
        let err = delivery.send_report("doc@example.com", &[]).await.unwrap_err();
        assert!(matches!(err, ReportError::Empty));
    }

    #[tokio::test]
    async fn history_outage_fails_generation() {
        let dir = tempfile::tempdir().unwrap();
        let api = Arc::new(InMemoryApi::demo(fixed_clock()).unwrap());
        api.set_outage(crate::memory::Endpoint::History, true);
        let api_dyn: Arc<dyn HealthApi> = api.clone();
        let delivery = FileReportDelivery::new(api_dyn, dir.path(), fixed_clock());
        let id = PatientId::new("1002003004").unwrap();

        let err = delivery.generate_report(&[id]).await.unwrap_err();
        assert!(matches!(err, ReportError::Gateway(GatewayError::Unavailable)));
    }
}
