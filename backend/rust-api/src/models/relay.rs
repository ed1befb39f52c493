use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use uuid::Uuid;

pub const TECHNICAL_ERROR_MESSAGE: &str =
    "Lo siento, ha ocurrido un error técnico. Por favor, inténtalo de nuevo.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelayAction {
    Chat,
    GenerateReviewExercises,
    NotifyFailureStreak,
}

impl RelayAction {
    pub const GENERATE_REVIEW_EXERCISES: &'static str = "generateReviewExercises";
    pub const NOTIFY_FAILURE_STREAK: &'static str = "notifyFailureStreak";

    /// Any action other than the two special ones is a chat message.
    pub fn parse(action: &str) -> Self {
        match action {
            Self::GENERATE_REVIEW_EXERCISES => RelayAction::GenerateReviewExercises,
            Self::NOTIFY_FAILURE_STREAK => RelayAction::NotifyFailureStreak,
            _ => RelayAction::Chat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayAction::Chat => "chat",
            RelayAction::GenerateReviewExercises => Self::GENERATE_REVIEW_EXERCISES,
            RelayAction::NotifyFailureStreak => Self::NOTIFY_FAILURE_STREAK,
        }
    }

    pub fn fallback_message(&self) -> &'static str {
        match self {
            RelayAction::Chat => {
                "Lo siento, el servicio de IA no está disponible en este momento. Por favor, inténtalo más tarde."
            }
            RelayAction::GenerateReviewExercises => {
                "No se pudieron generar los ejercicios de repaso en este momento. Por favor, inténtalo más tarde."
            }
            RelayAction::NotifyFailureStreak => {
                "No se pudo avisar al mentor en este momento. Lo intentaremos en tu próximo fallo."
            }
        }
    }

    pub fn connection_message(&self) -> &'static str {
        match self {
            RelayAction::Chat => {
                "Lo siento, no se pudo conectar con el Mentor IA. Comprueba tu conexión e inténtalo de nuevo."
            }
            RelayAction::GenerateReviewExercises => {
                "No se pudo conectar con el generador de ejercicios. Por favor, inténtalo de nuevo."
            }
            RelayAction::NotifyFailureStreak => {
                "No se pudo conectar con el servicio de mentoría."
            }
        }
    }
}

/// Relay body as sent by the browser. Every field is optional at this stage.
#[derive(Debug, Default, Deserialize)]
pub struct RawRelayRequest {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
    pub action: Option<String>,
    #[serde(rename = "chatInput", alias = "message")]
    pub chat_input: Option<String>,
    pub tema: Option<String>,
    pub area: Option<String>,
    #[serde(rename = "totalErrores")]
    pub total_errores: Option<u32>,
    pub pregunta_id: Option<String>,
    pub pregunta_texto: Option<String>,
    pub justificacion: Option<String>,
    pub fallos: Option<u32>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayRequestError {
    #[error("JSON inválido")]
    InvalidJson,
    #[error("Faltan datos requeridos")]
    MissingFields(Vec<&'static str>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub session_id: String,
    /// Action string as received (`sendMessage`, `chat`, ...), forwarded untouched.
    pub action: String,
    pub chat_input: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewExercisesRequest {
    pub session_id: String,
    pub area: String,
    pub topic: String,
    pub total_errors: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureStreakNotice {
    pub question_id: String,
    pub question_text: String,
    pub justification: String,
    pub failures: u32,
    pub user_id: Option<String>,
}

/// One variant per relay action, each carrying only the fields that action needs.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayRequest {
    Chat(ChatMessage),
    GenerateReviewExercises(ReviewExercisesRequest),
    NotifyFailureStreak(FailureStreakNotice),
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<RawRelayRequest> for RelayRequest {
    type Error = RelayRequestError;

    fn try_from(raw: RawRelayRequest) -> Result<Self, Self::Error> {
        let action = non_empty(raw.action)
            .ok_or_else(|| RelayRequestError::MissingFields(vec!["action"]))?;

        match RelayAction::parse(&action) {
            RelayAction::Chat => {
                let session_id = non_empty(raw.session_id);
                let chat_input = non_empty(raw.chat_input);
                match (session_id, chat_input) {
                    (Some(session_id), Some(chat_input)) => Ok(RelayRequest::Chat(ChatMessage {
                        session_id,
                        action,
                        chat_input,
                    })),
                    (session_id, chat_input) => {
                        let mut missing = Vec::new();
                        if session_id.is_none() {
                            missing.push("sessionId");
                        }
                        if chat_input.is_none() {
                            missing.push("chatInput");
                        }
                        Err(RelayRequestError::MissingFields(missing))
                    }
                }
            }
            RelayAction::GenerateReviewExercises => {
                match (non_empty(raw.area), non_empty(raw.tema)) {
                    (Some(area), Some(topic)) => {
                        Ok(RelayRequest::GenerateReviewExercises(ReviewExercisesRequest {
                            session_id: non_empty(raw.session_id)
                                .unwrap_or_else(|| Uuid::new_v4().simple().to_string()),
                            area,
                            topic,
                            total_errors: raw.total_errores.unwrap_or(0),
                        }))
                    }
                    _ => Err(RelayRequestError::MissingFields(vec!["area", "tema"])),
                }
            }
            RelayAction::NotifyFailureStreak => {
                let question_id = non_empty(raw.pregunta_id)
                    .ok_or_else(|| RelayRequestError::MissingFields(vec!["pregunta_id"]))?;
                Ok(RelayRequest::NotifyFailureStreak(FailureStreakNotice {
                    question_id,
                    question_text: raw.pregunta_texto.unwrap_or_default(),
                    justification: raw.justificacion.unwrap_or_default(),
                    failures: raw.fallos.unwrap_or(0),
                    user_id: non_empty(raw.user_id),
                }))
            }
        }
    }
}

impl RelayRequest {
    pub fn action(&self) -> RelayAction {
        match self {
            RelayRequest::Chat(_) => RelayAction::Chat,
            RelayRequest::GenerateReviewExercises(_) => RelayAction::GenerateReviewExercises,
            RelayRequest::NotifyFailureStreak(_) => RelayAction::NotifyFailureStreak,
        }
    }

    /// Body POSTed to the n8n webhook for this action.
    pub fn outbound_payload(&self) -> Value {
        match self {
            RelayRequest::Chat(msg) => json!({
                "sessionId": msg.session_id,
                "action": msg.action,
                "chatInput": msg.chat_input,
            }),
            RelayRequest::GenerateReviewExercises(req) => json!({
                "sessionId": req.session_id,
                "action": RelayAction::GENERATE_REVIEW_EXERCISES,
                "tema": req.topic,
                "area": req.area,
                "totalErrores": req.total_errors,
            }),
            RelayRequest::NotifyFailureStreak(notice) => json!({
                "action": RelayAction::NOTIFY_FAILURE_STREAK,
                "pregunta_id": notice.question_id,
                "pregunta_texto": notice.question_text,
                "justificacion": notice.justification,
                "fallos": notice.failures,
                "user_id": notice.user_id,
            }),
        }
    }
}

/// How a forwarded call ended. Every variant is answered with HTTP 200.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayOutcome {
    Forwarded(Value),
    Fallback {
        action: RelayAction,
        upstream_status: u16,
        upstream_body: String,
    },
    ConnectionError {
        action: RelayAction,
        error: String,
    },
    Internal {
        error: String,
    },
}

impl RelayOutcome {
    pub fn is_forwarded(&self) -> bool {
        matches!(self, RelayOutcome::Forwarded(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Forwarded(_) => "success",
            RelayOutcome::Fallback { .. } => "fallback",
            RelayOutcome::ConnectionError { .. } => "connection_error",
            RelayOutcome::Internal { .. } => "error",
        }
    }

    pub fn into_body(self) -> Value {
        match self {
            RelayOutcome::Forwarded(body) => body,
            RelayOutcome::Fallback {
                action,
                upstream_status,
                upstream_body,
            } => json!({
                "output": action.fallback_message(),
                "status": "fallback",
                "debug": {
                    "upstream_status": upstream_status,
                    "upstream_body": upstream_body,
                },
            }),
            RelayOutcome::ConnectionError { action, error } => json!({
                "output": action.connection_message(),
                "status": "connection_error",
                "debug": { "error": error },
            }),
            RelayOutcome::Internal { error } => json!({
                "output": TECHNICAL_ERROR_MESSAGE,
                "status": "error",
                "debug": { "error": error },
            }),
        }
    }
}
