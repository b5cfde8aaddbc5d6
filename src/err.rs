use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::OriginalUri;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub async fn handler404(OriginalUri(path): OriginalUri) -> Error {
    Error::NotFound {
        message: format!("Ruta inválida: {}", path),
    }
}

/// Every failure a handler can report. Clients only ever see the HTTP
/// status and `{"error": message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotFound { message: String },
    Conflict { message: String },
    InvalidPayload { message: String },
    InternalError { kind: &'static str, message: String },
    Unknown { message: String },
}

impl Error {
    pub fn not_found<S: Into<String>>(msg: S) -> Error {
        Error::NotFound {
            message: msg.into(),
        }
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Error {
        Error::Conflict {
            message: msg.into(),
        }
    }

    pub fn invalid<S: Into<String>>(msg: S) -> Error {
        Error::InvalidPayload {
            message: msg.into(),
        }
    }

    pub fn unknown<S: Into<String>>(msg: S) -> Error {
        Error::Unknown {
            message: msg.into(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::NotFound { message }
            | Error::Conflict { message }
            | Error::InvalidPayload { message }
            | Error::InternalError { message, .. }
            | Error::Unknown { message } => message,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Conflict { .. } | Error::InvalidPayload { .. } => StatusCode::BAD_REQUEST,
            Error::InternalError { .. } | Error::Unknown { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InternalError { kind, message } => write!(f, "{}: {}", kind, message),
            other => f.write_str(other.message()),
        }
    }
}

impl std::error::Error for Error {}

impl Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry("error", self.message())?;
        map.end()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("{}", self);
        }
        (status, Json(self)).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Error::not_found("Registro no encontrado"),
            sqlx::Error::Database(db) => {
                let message = db.message().to_string();
                match db.code().as_deref() {
                    Some("23505") => Error::Conflict { message },
                    Some("23503") | Some("23502") | Some("23514") => {
                        Error::InvalidPayload { message }
                    }
                    Some(code) if code.starts_with("22") => Error::InvalidPayload { message },
                    _ => Error::InternalError {
                        kind: "DatabaseError",
                        message,
                    },
                }
            }
            other => Self::InternalError {
                kind: "DatabaseError",
                message: other.to_string(),
            },
        }
    }
}

impl From<sqlx::migrate::MigrateError> for Error {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::InternalError {
            kind: "MigrationError",
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidPayload {
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidPayload {
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidPayload {
            message: rejection.body_text(),
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Unknown {
            message: err.to_string(),
        }
    }
}
