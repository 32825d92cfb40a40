use chrono::Local;
use hmac::{Hmac, Mac};
use jwt::VerifyWithKey;
use potion::HtmlError;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{error::RecipeError, schema::UserId};

/// Claims carried by the session token issued by the auth service.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SessionClaims {
    pub user_id: UserId,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
}

/// Who is making the request. Anonymous viewers may only read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Viewer {
    Anonymous,
    User(UserId),
}

impl Viewer {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn require_user(&self) -> Result<UserId, RecipeError> {
        self.user_id()
            .ok_or(RecipeError::PermissionDenied("Authentication credentials were not provided"))
    }
}

impl From<Option<UserId>> for Viewer {
    fn from(value: Option<UserId>) -> Self {
        value.map(Viewer::User).unwrap_or(Viewer::Anonymous)
    }
}

impl From<&SessionClaims> for Viewer {
    fn from(value: &SessionClaims) -> Self {
        Viewer::User(value.user_id)
    }
}

fn session_key(secret: &[u8]) -> Result<Hmac<Sha256>, potion::Error> {
    Hmac::new_from_slice(secret)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid key"))
}

pub fn verify_session(token: &str, secret: &[u8]) -> Result<SessionClaims, potion::Error> {
    let key = session_key(secret)?;

    let session: SessionClaims = token
        .verify_with_key(&key)
        .map_err(|_| HtmlError::InvalidSession.new("Invalid Session; Invalid token"))?;

    let now = Local::now().timestamp();
    if (session.exp - now).is_negative() {
        return Err(HtmlError::InvalidSession.new("Invalid session; Token expired"));
    }

    Ok(session)
}
