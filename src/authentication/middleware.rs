use std::sync::Arc;

use log::debug;
use warp::{
    filters::BoxedFilter,
    reject::{self, Rejection},
    Filter,
};

use super::session::{verify_session, Viewer};
use crate::{constants::SESSION_COOKIE, schema::UserId};

#[derive(Debug)]
struct Unauthorized;

impl reject::Reject for Unauthorized {}

/// Resolves the request's viewer. A missing or invalid session reads as anonymous.
pub fn with_viewer(secret: Arc<[u8]>) -> BoxedFilter<(Viewer,)> {
    warp::cookie::optional::<String>(SESSION_COOKIE)
        .map(move |session: Option<String>| match session {
            Some(token) => match verify_session(&token, &secret) {
                Ok(claims) => Viewer::from(&claims),
                Err(_) => {
                    debug!("Ignoring invalid session cookie");
                    Viewer::Anonymous
                }
            },
            None => Viewer::Anonymous,
        })
        .boxed()
}

/// Like [`with_viewer`] but rejects anonymous requests.
pub fn with_user(secret: Arc<[u8]>) -> BoxedFilter<(UserId,)> {
    with_viewer(secret)
        .and_then(|viewer: Viewer| async move {
            viewer
                .user_id()
                .ok_or_else(|| reject::custom(Unauthorized))
        })
        .boxed()
}
