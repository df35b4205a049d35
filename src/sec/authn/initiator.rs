use std::ops::Deref;
use std::pin::Pin;
use std::future::Future;

use axum::http::header::HeaderMap;
use axum::http::request::Parts;
use axum::extract::FromRequestParts;
use profile_lib::ids;

use crate::config::Identity;
use crate::net::error::{self, AuthKind};
use crate::user::{User, UserRepository, StoreError};
use crate::user::store::MemoryStore;

/// the authenticated user a request is made for
#[derive(Debug)]
pub struct Initiator {
    pub user: User,
}

impl Initiator {
    pub fn user(&self) -> &User {
        &self.user
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("identity header was not found")]
    HeaderNotFound,

    #[error("identity header does not contain a valid user id")]
    InvalidId,

    #[error("user was not found: {0}")]
    UserNotFound(ids::UserId),

    #[error("user is blocked: {0}")]
    Blocked(ids::UserId),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    HeaderToStr(#[from] axum::http::header::ToStrError),
}

impl From<LookupError> for error::Error {
    fn from(e: LookupError) -> Self {
        match e {
            LookupError::HeaderNotFound |
            LookupError::InvalidId |
            LookupError::UserNotFound(_) => error::Error::api(AuthKind::Unauthenticated),
            LookupError::Blocked(_) => error::Error::api(AuthKind::PermissionDenied),
            LookupError::Store(e) => e.into(),
            LookupError::HeaderToStr(e) => e.into(),
        }
    }
}

pub fn lookup_header_map(
    identity: &Identity,
    store: &impl UserRepository,
    headers: &HeaderMap
) -> Result<Initiator, LookupError> {
    let Some(value) = headers.get(identity.header.as_str()) else {
        return Err(LookupError::HeaderNotFound);
    };

    let user_id = ids::user_id_from_str(value.to_str()?)
        .ok_or(LookupError::InvalidId)?;

    let Some(user) = store.load(&user_id)? else {
        return Err(LookupError::UserNotFound(user_id));
    };

    if user.block {
        return Err(LookupError::Blocked(user_id));
    }

    Ok(Initiator { user })
}

impl<A, S> FromRequestParts<A> for Initiator
where
    A: Deref<Target = S> + Sync,
    S: AsRef<Identity> + AsRef<MemoryStore> + Sync,
{
    type Rejection = error::Error;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 A,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait
    {
        Box::pin(async move {
            let state_deref = state.deref();

            let identity: &Identity = state_deref.as_ref();
            let store: &MemoryStore = state_deref.as_ref();

            let initiator = lookup_header_map(identity, store, &parts.headers)?;

            tracing::debug!("request initiated by user {}", initiator.user.id);

            Ok(initiator)
        })
    }
}
