use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResponseError {
    /// The service answered with an `error` field.
    #[error("{0}")]
    Service(String),
    #[error("analysis response is missing `{0}`")]
    MissingField(&'static str),
    #[error("malformed analysis response: {0}")]
    Malformed(String),
}

impl ResponseError {
    pub fn is_service_reported(&self) -> bool {
        matches!(self, Self::Service(_))
    }
}

impl From<serde_json::Error> for ResponseError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}
