use axum::response::IntoResponse;
use tracing::Level;

pub use profile_api::error::{
    Detail,
    ApiErrorKind,
    ApiError,
    AuthKind,
    GeneralKind,
    ProfileKind,
};

use crate::profile::ProfileError;
use crate::user::{BindError, StoreError};

type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// error returned from request handlers. the inner [`ApiError`] is sent to
/// the client while the source is only logged
#[derive(Debug)]
pub struct Error {
    inner: ApiError,
    context: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Self {
        Error {
            inner: Default::default(),
            context: None,
            src: None,
        }
    }

    pub fn api<T>(value: T) -> Self
    where
        T: Into<ApiError>
    {
        Error {
            inner: value.into(),
            context: None,
            src: None
        }
    }

    pub fn kind<K>(mut self, kind: K) -> Self
    where
        K: Into<ApiErrorKind>
    {
        self.inner = self.inner.with_kind(kind);
        self
    }

    pub fn context<C>(mut self, ctx: C) -> Self
    where
        C: Into<String>
    {
        self.context = Some(ctx.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Self
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }

    pub fn inner(&self) -> &ApiError {
        &self.inner
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.inner, &self.context, &self.src) {
            (inner, Some(cxt), Some(err)) => write!(f, "inner: {inner}\ncxt: {cxt}\nerr: {err}"),
            (inner, Some(cxt), None) => write!(f, "inner: {inner}\ncxt: {cxt}"),
            (inner, None, Some(err)) => write!(f, "inner: {inner}\nerr: {err}"),
            (inner, None, None) => write!(f, "inner: {inner}")
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Some(err) = self.src.as_ref() {
            match &self.context {
                Some(cxt) => tracing::event!(
                    Level::ERROR,
                    "unhandled error when processing request: {cxt} {err:#?}"
                ),
                None => tracing::event!(
                    Level::ERROR,
                    "unhandled error when processing request: {err:#?}"
                ),
            }
        }

        self.inner.into_response()
    }
}

impl From<ApiError> for Error {
    fn from(api_err: ApiError) -> Self {
        Error::api(api_err)
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Error::api(ProfileKind::UserNotFound),
            StoreError::UsernameExists => Error::api((ProfileKind::UsernameExists, err.to_string())),
            StoreError::EmailExists => Error::api((ProfileKind::EmailExists, err.to_string())),
            StoreError::InvalidName |
            StoreError::InvalidUsername |
            StoreError::InvalidEmail => Error::api((ProfileKind::SaveFailed, err.to_string())),
        }
    }
}

impl From<BindError> for Error {
    fn from(err: BindError) -> Self {
        match err {
            BindError::Password(err) => Error::new()
                .context("failed to hash submitted password")
                .source(err),
            BindError::InvalidType(_) |
            BindError::InvalidLanguage { .. } |
            BindError::PasswordMismatch => Error::api((ProfileKind::BindFailed, err.to_string())),
        }
    }
}

impl From<ProfileError> for Error {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::FormUnavailable => Error::api(ProfileKind::FormUnavailable),
            ProfileError::NotFound(_) => Error::api(ProfileKind::UserNotFound),
            ProfileError::Bind(err) => err.into(),
            ProfileError::Persistence(err) => err.into(),
        }
    }
}

macro_rules! simple_from {
    ($e:path, $k:expr) => {
        impl From<$e> for Error {
            fn from(err: $e) -> Self {
                Error::new()
                    .kind($k)
                    .source(err)
            }
        }
    };
}

simple_from!(
    axum::http::header::ToStrError,
    GeneralKind::InvalidRequest
);
