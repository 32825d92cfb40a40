use std::fmt::{self, Display};

use potion::{Error, HtmlError};
use serde_json::{Map, Value};
use thiserror::Error as ThisError;
use warp::{http::StatusCode, reject::Rejection};

use crate::schema::Id;

/// Failure raised by a store implementation. Always surfaces to callers as
/// [`RecipeError::Internal`] unless the writer recognises a uniqueness race.
#[derive(Debug, Clone)]
pub struct StoreError {
    info: String,
    unique_violation: bool,
}

impl StoreError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    pub fn unique_violation(info: String) -> Self {
        Self {
            info,
            unique_violation: true,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => {
                if e.is_unique_violation() {
                    Self::unique_violation(format!("{e}"))
                } else {
                    Self::new(format!("{e}"))
                }
            }
            sqlx::Error::RowNotFound => Self::new(format!("RowNotFound")),
            sqlx::Error::PoolTimedOut => Self::new(format!("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(format!("Pool closed")),
            sqlx::Error::WorkerCrashed => Self::new(format!("Worker crashed")),
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}

impl std::error::Error for StoreError {}

/// Malformed request data, such as an unparsable query parameter.
#[derive(Debug)]
pub struct TypeError {
    info: String,
}

impl TypeError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for TypeError {}

impl From<TypeError> for Error {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info)
    }
}

impl From<TypeError> for Rejection {
    fn from(value: TypeError) -> Self {
        HtmlError::InvalidRequest.new(&value.info).into()
    }
}

#[derive(ThisError, Debug)]
pub enum RenderError {
    #[error("failed to write document: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build pdf: {0}")]
    Pdf(#[from] printpdf::Error),
}

#[derive(ThisError, Debug)]
pub enum RecipeError {
    #[error("{field}: at least one entry is required")]
    EmptyCollection { field: &'static str },

    #[error("{field}: value must be at least 1")]
    OutOfRange { field: &'static str },

    #[error("{field}: duplicate entries are not allowed")]
    DuplicateEntry { field: &'static str },

    #[error("{entity} '{key}' already exists")]
    Conflict { entity: &'static str, key: String },

    #[error("{entity} with id {id} does not exist")]
    NotFound { entity: &'static str, id: Id },

    #[error("{0}")]
    InvalidOperation(&'static str),

    #[error("{0}")]
    PermissionDenied(&'static str),

    #[error("store failure: {0}")]
    Internal(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl RecipeError {
    /// Payload field a shape failure belongs to.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::EmptyCollection { field }
            | Self::OutOfRange { field }
            | Self::DuplicateEntry { field } => Some(*field),
            Self::Conflict { entity: "recipe", .. } => Some("name"),
            _ => None,
        }
    }

    /// Dangling references are reported apart from shape failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmptyCollection { .. }
            | Self::OutOfRange { .. }
            | Self::DuplicateEntry { .. }
            | Self::Conflict { .. }
            | Self::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Self::Internal(_) | Self::Render(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Field-tagged response body: `{"amount": "..."}` or `{"detail": "..."}`.
    pub fn body(&self) -> Value {
        let key = self.field().unwrap_or("detail");
        let mut body = Map::new();
        body.insert(key.to_string(), Value::String(self.to_string()));

        Value::Object(body)
    }
}

impl From<RecipeError> for Error {
    fn from(value: RecipeError) -> Self {
        if let RecipeError::Internal(e) = &value {
            log::error!("{e}");
        }

        Error {
            code: value.status().as_u16().into(),
            info: Some(value.body().to_string()),
            redirect: None,
        }
    }
}

impl From<RecipeError> for Rejection {
    fn from(value: RecipeError) -> Self {
        let error: Error = value.into();
        error.into()
    }
}
