use failure::Fail;

/// Failures talking to the recognition backend.
///
/// None of these are fatal; every one is recovered by a later user action
/// (resubmitting, retrying the assignment) or by the next poll.
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum ClientError {
    /// The request never completed.
    #[fail(display = "Network failure: {}", _0)]
    Network(String),
    /// The backend answered with an explicit `error` field.
    #[fail(display = "Backend error ({}): {}", status, error)]
    Rejected { status: u16, error: String },
    /// The backend answered with a non-2xx status and no usable body.
    #[fail(display = "Backend returned status {}", _0)]
    Status(u16),
    /// The response did not have the expected shape.
    #[fail(display = "Malformed response: {}", _0)]
    Malformed(String),
}

impl ClientError {
    /// Error text reported by the backend itself, if there was any.
    pub fn backend_error(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Malformed(e.to_string())
        } else {
            ClientError::Network(e.to_string())
        }
    }
}
