use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The backend could not be reached or did not answer in time.
    Unavailable,
    /// The backend answered with something we cannot decode.
    Malformed,
    Other,
}

#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    msg: String,
}

impl Error {
    pub fn msg<M: Into<String>>(msg: M) -> Self {
        Self {
            kind: ErrorKind::Other,
            msg: msg.into(),
        }
    }

    pub fn unavailable<M: Into<String>>(msg: M) -> Self {
        Self {
            kind: ErrorKind::Unavailable,
            msg: msg.into(),
        }
    }

    pub fn malformed<M: Into<String>>(msg: M) -> Self {
        Self {
            kind: ErrorKind::Malformed,
            msg: msg.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::Unavailable => write!(f, "service unavailable: {}", self.msg),
            ErrorKind::Malformed => write!(f, "unexpected response: {}", self.msg),
            ErrorKind::Other => write!(f, "{}", self.msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::msg(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::malformed(err.to_string())
        } else {
            Self::unavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_errors_carry_service_prefix() {
        let e = Error::unavailable("connection refused");
        assert_eq!(e.kind(), ErrorKind::Unavailable);
        assert_eq!(e.to_string(), "service unavailable: connection refused");
        assert_eq!(e.message(), "connection refused");
    }

    #[test]
    fn json_errors_are_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        assert_eq!(Error::from(err).kind(), ErrorKind::Malformed);
    }
}
