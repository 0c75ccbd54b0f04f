use std::env;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vital_core::model::{
    Answer, Diagnosis, HistoryEntry, PatientId, Question, QuestionId, Role, User,
};

use crate::api::{AnswerSubmission, GatewayError, HealthApi};

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: String,
}

impl ApiConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Reads `VITAL_API_URL`, falling back to the local development backend.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("VITAL_API_URL").unwrap_or_else(|_| "http://localhost:3000".into());
        Self { base_url }
    }
}

//
// ─── HTTP ADAPTER ──────────────────────────────────────────────────────────────
//

/// `HealthApi` adapter over the JSON/HTTP backend.
#[derive(Clone)]
pub struct HttpApi {
    client: Client,
    config: ApiConfig,
}

impl HttpApi {
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl HealthApi for HttpApi {
    async fn login(&self, username: &str, password: &str) -> Result<User, GatewayError> {
        let response = self
            .client
            .post(self.endpoint("usuario/login"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let (status, envelope) = decode::<LoginEnvelope>(response).await?;
        match envelope.data {
            Some(data) => data.into_user(),
            None => Err(rejection(envelope.error, envelope.message, status)),
        }
    }

    async fn fetch_questions(&self) -> Result<Vec<Question>, GatewayError> {
        let response = self
            .client
            .get(self.endpoint("pregunta/get"))
            .send()
            .await?;

        let (status, envelope) = decode::<QuestionsEnvelope>(response).await?;
        if !status.is_success() {
            return Err(rejection(envelope.error, envelope.message, status));
        }
        let records = envelope
            .data
            .ok_or_else(|| GatewayError::Malformed("question list missing `data`".into()))?;
        Ok(records
            .into_iter()
            .map(|record| Question::new(QuestionId::new(record.id), record.pregunta))
            .collect())
    }

    async fn submit_answers(
        &self,
        submission: &AnswerSubmission,
    ) -> Result<Diagnosis, GatewayError> {
        let user = &submission.user;
        let payload = SubmissionRequest {
            nombre: user.name(),
            apellido: user.surname(),
            identificacion: user.identification().as_str(),
            edad: user.age(),
            sexo: user.sex(),
            respuestas: wire_answers(&submission.answers),
        };

        let response = self
            .client
            .post(self.endpoint("respuesta/add"))
            .json(&payload)
            .send()
            .await?;

        let (status, envelope) = decode::<DiagnosisEnvelope>(response).await?;
        match envelope.diagnostico {
            Some(value) if status.is_success() => Ok(diagnosis_from_value(value)),
            _ => Err(rejection(envelope.error, envelope.message, status)),
        }
    }

    async fn submit_answers_unsaved(
        &self,
        answers: &[Answer],
    ) -> Result<Diagnosis, GatewayError> {
        let payload = UnsavedSubmissionRequest {
            respuestas: wire_answers(answers),
        };

        let response = self
            .client
            .post(self.endpoint("respuesta/addWithoutSaving"))
            .json(&payload)
            .send()
            .await?;

        let (status, envelope) = decode::<DiagnosisEnvelope>(response).await?;
        match envelope.diagnostico {
            Some(value) if status.is_success() => Ok(diagnosis_from_value(value)),
            _ => Err(rejection(envelope.error, envelope.message, status)),
        }
    }

    async fn submit_progress_note(
        &self,
        id: &PatientId,
        note: &str,
    ) -> Result<(), GatewayError> {
        let payload = ProgressRequest {
            identificacion: id.as_str(),
            descripcion: note,
        };

        let response = self
            .client
            .post(self.endpoint("respuesta/addProgress"))
            .json(&payload)
            .send()
            .await?;

        let (status, envelope) = decode::<AckEnvelope>(response).await?;
        if status.is_success() {
            Ok(())
        } else {
            Err(rejection(envelope.error, envelope.message, status))
        }
    }

    async fn fetch_history(
        &self,
        id: &PatientId,
        only_last: bool,
    ) -> Result<Vec<HistoryEntry>, GatewayError> {
        let response = self
            .client
            .get(self.endpoint("historial/get"))
            .query(&[
                ("identificacion", id.as_str()),
                ("last", if only_last { "true" } else { "false" }),
            ])
            .send()
            .await?;

        let (status, envelope) = decode::<HistoryEnvelope>(response).await?;
        if !status.is_success() {
            return Err(rejection(envelope.error, envelope.message, status));
        }
        let records = envelope
            .data
            .ok_or_else(|| GatewayError::Malformed("history missing `data`".into()))?;
        Ok(records
            .into_iter()
            .map(|record| {
                let diagnosis = diagnosis_from_value(record.diagnostico.unwrap_or(Value::Null));
                HistoryEntry::new(record.fecha, diagnosis)
            })
            .collect())
    }
}

//
// ─── RESPONSE HANDLING ─────────────────────────────────────────────────────────
//

/// Reads the body as JSON, keeping the status for rejection mapping. A
/// non-success status with an unreadable body maps to `HttpStatus` rather
/// than a decode error.
async fn decode<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<(StatusCode, T), GatewayError> {
    let status = response.status();
    match response.json::<T>().await {
        Ok(body) => Ok((status, body)),
        Err(_) if !status.is_success() => Err(GatewayError::HttpStatus(status)),
        Err(err) => Err(GatewayError::Http(err)),
    }
}

/// Normalizes the backend's application-level failures. Revisions of the
/// backend disagree on the field name (`error` vs `message`); `error` wins
/// when both are present.
fn rejection(
    error: Option<String>,
    message: Option<String>,
    status: StatusCode,
) -> GatewayError {
    match error.or(message).filter(|m| !m.trim().is_empty()) {
        Some(m) => GatewayError::Rejected(m),
        None => GatewayError::HttpStatus(status),
    }
}

fn diagnosis_from_value(value: Value) -> Diagnosis {
    match value {
        Value::String(text) => Diagnosis::Text(text),
        Value::Object(fields) => Diagnosis::Structured(
            fields
                .into_iter()
                .map(|(key, value)| (key, scalar_to_string(value)))
                .collect(),
        ),
        Value::Null => Diagnosis::Text(String::new()),
        other => Diagnosis::Text(other.to_string()),
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn wire_answers(answers: &[Answer]) -> Vec<WireAnswer> {
    answers
        .iter()
        .map(|answer| WireAnswer {
            id_pregunta: answer.question_id().value(),
            respuesta_valor: answer.value(),
        })
        .collect()
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginEnvelope {
    message: Option<String>,
    error: Option<String>,
    data: Option<LoginData>,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    rol: String,
    nombre: String,
    apellido: Option<String>,
    identificacion: String,
    edad: Option<u8>,
    sexo: Option<String>,
}

impl LoginData {
    fn into_user(self) -> Result<User, GatewayError> {
        let role: Role = self
            .rol
            .parse()
            .map_err(|err: vital_core::model::UserError| GatewayError::Malformed(err.to_string()))?;
        let identification = PatientId::new(self.identificacion)
            .map_err(|err| GatewayError::Malformed(err.to_string()))?;
        User::new(
            self.nombre,
            self.apellido.unwrap_or_default(),
            identification,
            self.edad.unwrap_or_default(),
            self.sexo.unwrap_or_default(),
            role,
        )
        .map_err(|err| GatewayError::Malformed(err.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct QuestionsEnvelope {
    message: Option<String>,
    error: Option<String>,
    data: Option<Vec<QuestionRecord>>,
}

#[derive(Debug, Deserialize)]
struct QuestionRecord {
    id: u64,
    pregunta: String,
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    nombre: &'a str,
    apellido: &'a str,
    identificacion: &'a str,
    edad: u8,
    sexo: &'a str,
    respuestas: Vec<WireAnswer>,
}

#[derive(Debug, Serialize)]
struct UnsavedSubmissionRequest {
    respuestas: Vec<WireAnswer>,
}

#[derive(Debug, Serialize)]
struct WireAnswer {
    id_pregunta: u64,
    respuesta_valor: bool,
}

#[derive(Debug, Deserialize)]
struct DiagnosisEnvelope {
    message: Option<String>,
    error: Option<String>,
    diagnostico: Option<Value>,
}

#[derive(Debug, Serialize)]
struct ProgressRequest<'a> {
    identificacion: &'a str,
    descripcion: &'a str,
}

#[derive(Debug, Deserialize)]
struct AckEnvelope {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    message: Option<String>,
    error: Option<String>,
    data: Option<Vec<HistoryRecord>>,
}

#[derive(Debug, Deserialize)]
struct HistoryRecord {
    fecha: String,
    diagnostico: Option<Value>,
}
