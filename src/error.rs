type BoxDynError = Box<dyn std::error::Error + Send + Sync>;

/// general error used while starting the server. request handling uses
/// [`crate::net::error::Error`] instead
#[derive(Debug)]
pub struct Error {
    msg: Option<String>,
    src: Option<BoxDynError>,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn new() -> Error {
        Error {
            msg: None,
            src: None,
        }
    }

    pub fn context<M>(mut self, msg: M) -> Error
    where
        M: Into<String>
    {
        self.msg = Some(msg.into());
        self
    }

    pub fn source<S>(mut self, src: S) -> Error
    where
        S: Into<BoxDynError>
    {
        self.src = Some(src.into());
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.msg.as_ref(), self.src.as_ref()) {
            (Some(msg), Some(err)) => write!(f, "{msg}\n{err}"),
            (Some(msg), None) => write!(f, "{msg}"),
            (None, Some(err)) => write!(f, "{err}"),
            (None, None) => write!(f, "failed to start"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.src.as_ref().map(|v| & **v as _)
    }
}

pub trait Context<T, E> {
    fn context<C>(self, cxt: C) -> std::result::Result<T, Error>
    where
        C: Into<String>;
}

impl<T, E> Context<T, E> for std::result::Result<T, E>
where
    E: Into<BoxDynError>
{
    fn context<C>(self, cxt: C) -> std::result::Result<T, Error>
    where
        C: Into<String>
    {
        match self {
            Ok(v) => Ok(v),
            Err(err) => Err(Error::new()
                .context(cxt)
                .source(err))
        }
    }
}

impl<T> Context<T, ()> for std::option::Option<T> {
    fn context<C>(self, cxt: C) -> std::result::Result<T, Error>
    where
        C: Into<String>
    {
        match self {
            Some(v) => Ok(v),
            None => Err(Error::new()
                .context(cxt))
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn context_wraps_source() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing"
        ));

        let err = result.context("failed to open config file").unwrap_err();

        assert_eq!(err.to_string(), "failed to open config file\nmissing");
        assert!(std::error::Error::source(&err).is_some());

        let err = None::<()>.context("no parent path").unwrap_err();

        assert_eq!(err.to_string(), "no parent path");
    }
}
