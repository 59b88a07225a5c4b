use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Error interacting with an external API (network failure or non-success status).
    ExternalApiError(String),
    /// The upstream responded, but the payload is not usable dashboard data.
    InvalidPayload(String),
    /// Requested state has not been produced yet (e.g. before the first refresh).
    NotReady(String),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ExternalApiError(msg) => write!(f, "External API error: {}", msg),
            AppError::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
            AppError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// Short machine-readable category, safe to return to clients.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::ExternalApiError(_) => "upstream_error",
            AppError::InvalidPayload(_) => "invalid_payload",
            AppError::NotReady(_) => "not_ready",
            AppError::InternalError(_) => "internal_error",
            AppError::WithContext { source, .. } => source.category(),
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    /// Upstream details are logged, not echoed to the client.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ExternalApiError(msg) => {
                tracing::error!("External API error: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service error".to_string(),
                )
            }
            AppError::InvalidPayload(msg) => {
                tracing::error!("Invalid upstream payload: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "External service returned unexpected data".to_string(),
                )
            }
            AppError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidPayload(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }
}

/// Classified failure of the advice pipeline.
///
/// Each kind maps to a distinct message for end users; the `String` payloads
/// carry provider detail for logs only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceError {
    /// No API key was configured at startup.
    MissingCredential,
    /// The provider rejected the configured key.
    CredentialRejected(String),
    /// The provider signalled a rate or quota limit.
    QuotaExceeded(String),
    /// The generated text did not match `{"advice": [string, ...]}`.
    MalformedResponse(String),
    /// Transport failure, unexpected status, or an undecodable envelope.
    ProviderUnavailable(String),
}

/// Serializable discriminant of [`AdviceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceErrorKind {
    MissingCredential,
    CredentialRejected,
    QuotaExceeded,
    MalformedResponse,
    ProviderUnavailable,
}

impl AdviceError {
    pub fn kind(&self) -> AdviceErrorKind {
        match self {
            AdviceError::MissingCredential => AdviceErrorKind::MissingCredential,
            AdviceError::CredentialRejected(_) => AdviceErrorKind::CredentialRejected,
            AdviceError::QuotaExceeded(_) => AdviceErrorKind::QuotaExceeded,
            AdviceError::MalformedResponse(_) => AdviceErrorKind::MalformedResponse,
            AdviceError::ProviderUnavailable(_) => AdviceErrorKind::ProviderUnavailable,
        }
    }

    /// Message shown to dashboard viewers. Never contains provider text.
    pub fn user_message(&self) -> &'static str {
        match self {
            AdviceError::MissingCredential => {
                "Gemini APIキーが設定されていません。環境設定を確認してください。"
            }
            AdviceError::CredentialRejected(_) => {
                "Gemini APIキーが無効です。キーの設定を確認してください。"
            }
            AdviceError::QuotaExceeded(_) => {
                "APIの利用上限に達しました。しばらく時間をおいて再度お試しください。"
            }
            AdviceError::MalformedResponse(_) => "AIから予期しない形式の応答がありました。",
            AdviceError::ProviderUnavailable(_) => {
                "AIからの応答がありませんでした。ネットワーク接続を確認するか、時間をおいて再度お試しください。"
            }
        }
    }
}

impl fmt::Display for AdviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceError::MissingCredential => write!(f, "Gemini API key is not configured"),
            AdviceError::CredentialRejected(msg) => write!(f, "Gemini rejected API key: {}", msg),
            AdviceError::QuotaExceeded(msg) => write!(f, "Gemini quota exceeded: {}", msg),
            AdviceError::MalformedResponse(msg) => write!(f, "Malformed advice response: {}", msg),
            AdviceError::ProviderUnavailable(msg) => write!(f, "Gemini unavailable: {}", msg),
        }
    }
}

impl std::error::Error for AdviceError {}
