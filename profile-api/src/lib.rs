mod response;

pub mod error;
pub use error::{ApiError, ApiErrorKind, Detail};

pub mod payload;
pub use payload::Payload;

pub mod form;
pub mod profile;
