//! Session endpoints: submit, rewind, clear, language, reference audio

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};

use super::ApiState;
use crate::session::{ConversationHistory, Role, Session};
use crate::voice::{Waveform, embed_audio};

/// Upper bound for an uploaded reference recording
pub const MAX_REFERENCE_BYTES: usize = 25 * 1024 * 1024;

/// Build session router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/languages", get(languages))
        .route("/session", get(show))
        .route("/session/messages", post(submit))
        .route("/session/rewind", post(rewind))
        .route("/session/clear", post(clear))
        .route("/session/language", put(select_language))
        .route(
            "/session/reference-audio",
            put(upload_reference).layer(DefaultBodyLimit::max(MAX_REFERENCE_BYTES)),
        )
        .with_state(state)
}

/// A turn as displayed in the chat view
#[derive(Debug, Serialize)]
pub struct TurnView {
    pub index: usize,
    pub id: String,
    pub role: Role,
    pub text: String,
    pub created_at: String,
    pub has_audio: bool,
    /// Only the newest assistant turn autoplays
    pub autoplay: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_html: Option<String>,
}

/// Active language selection
#[derive(Debug, Serialize)]
pub struct LanguageView {
    pub label: String,
    pub code: String,
}

/// Reference sample in use
#[derive(Debug, Serialize)]
pub struct ReferenceView {
    pub path: String,
    pub captured_at: String,
}

/// Full session snapshot
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub language: LanguageView,
    pub reference_audio: Option<ReferenceView>,
    pub show_audio: bool,
    pub turns: Vec<TurnView>,
}

/// Selectable languages
#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub labels: Vec<String>,
    pub selected: String,
}

/// Render the history for display
///
/// # Errors
///
/// Returns error if an audio clip cannot be encoded
pub fn render_turns(history: &ConversationHistory, show_audio: bool) -> crate::Result<Vec<TurnView>> {
    history
        .iter()
        .enumerate()
        .map(|(index, turn)| {
            let autoplay = history.is_latest_assistant_turn(index);
            let audio_html = match (&turn.audio, show_audio) {
                (Some(audio), true) => Some(embed_audio(audio, autoplay)?),
                _ => None,
            };
            Ok(TurnView {
                index,
                id: turn.id.to_string(),
                role: turn.role,
                text: turn.text.clone(),
                created_at: turn.created_at.to_rfc3339(),
                has_audio: turn.audio.is_some(),
                autoplay,
                audio_html,
            })
        })
        .collect()
}

fn snapshot(session: &Session, show_audio: bool) -> Result<SessionView, ApiError> {
    let language = session.language();
    Ok(SessionView {
        language: LanguageView {
            label: language.selected_label().to_string(),
            code: language.language_code().to_string(),
        },
        reference_audio: language.reference_audio().map(|r| ReferenceView {
            path: r.path.display().to_string(),
            captured_at: r.captured_at.to_rfc3339(),
        }),
        show_audio,
        turns: render_turns(session.history(), show_audio)?,
    })
}

/// List selectable languages
async fn languages(State(state): State<Arc<ApiState>>) -> Json<LanguagesResponse> {
    let session = state.session.read().await;
    Json(LanguagesResponse {
        labels: session
            .catalog()
            .selectable_labels()
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        selected: session.language().selected_label().to_string(),
    })
}

/// Show the session
async fn show(State(state): State<Arc<ApiState>>) -> Result<Json<SessionView>, ApiError> {
    let session = state.session.read().await;
    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Submission request
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub prompt: String,
}

/// Submit a prompt
///
/// The user turn is visible to readers while the reply is produced; the
/// command lock keeps other mutations out until the reply lands.
async fn submit(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let _command = state.commands.lock().await;

    let language = state.session.write().await.begin_submission(&request.prompt)?;
    let outcome = state
        .pipeline
        .process_submission(&request.prompt, &language)
        .await;

    let mut session = state.session.write().await;
    session.complete_submission(outcome)?;
    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Rewind the last exchange
async fn rewind(State(state): State<Arc<ApiState>>) -> Result<Json<SessionView>, ApiError> {
    let _command = state.commands.lock().await;
    let mut session = state.session.write().await;
    session.rewind();
    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Clear the history
async fn clear(State(state): State<Arc<ApiState>>) -> Result<Json<SessionView>, ApiError> {
    let _command = state.commands.lock().await;
    let mut session = state.session.write().await;
    session.clear();
    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Language selection request
#[derive(Debug, Deserialize)]
pub struct SelectLanguageRequest {
    pub label: String,
}

async fn select_language(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SelectLanguageRequest>,
) -> Result<Json<SessionView>, ApiError> {
    let _command = state.commands.lock().await;
    let mut session = state.session.write().await;
    session.select_language(&request.label)?;
    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Replace the reference sample with an uploaded WAV recording
async fn upload_reference(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<SessionView>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty audio data".to_string()));
    }
    Waveform::from_wav(&body)
        .map_err(|e| ApiError::BadRequest(format!("reference audio must be WAV: {e}")))?;

    let _command = state.commands.lock().await;
    if let Some(parent) = state.reference_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))?;
    }
    tokio::fs::write(&state.reference_path, &body)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    let mut session = state.session.write().await;
    session.set_reference_path(state.reference_path.clone())?;

    Ok(Json(snapshot(&session, state.show_audio)?))
}

/// Session API errors
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Configuration(String),
    Unavailable(String),
    GenerationFailed(String),
    SynthesisFailed {
        message: String,
        response_text: Option<String>,
    },
    Internal(String),
}

impl From<crate::Error> for ApiError {
    fn from(e: crate::Error) -> Self {
        use crate::Error;

        match e {
            Error::EmptyPrompt => Self::BadRequest(e.to_string()),
            Error::Config(_) => Self::Configuration(e.to_string()),
            Error::ModelLoad(_) => Self::Unavailable(e.to_string()),
            Error::Service(_) => Self::GenerationFailed(e.to_string()),
            Error::Synthesis { .. } => Self::SynthesisFailed {
                response_text: e.response_text().map(ToString::to_string),
                message: e.to_string(),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            response_text: Option<String>,
        }

        let (status, code, message, response_text) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Configuration(msg) => (StatusCode::BAD_REQUEST, "configuration", msg, None),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable", msg, None),
            Self::GenerationFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "text_generation_failed", msg, None)
            }
            Self::SynthesisFailed {
                message,
                response_text,
            } => (StatusCode::BAD_GATEWAY, "synthesis_failed", message, response_text),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg, None),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody {
                    code,
                    message,
                    response_text,
                },
            }),
        )
            .into_response()
    }
}
