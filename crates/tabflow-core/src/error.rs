/// Error taxonomy for the backend. Per-request variants become an error
/// response for that request only; `ResponseCountMismatch` fails every
/// request in the execute call; `Init` and `WorkflowLoad` are fatal to the
/// backend and the model respectively.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("runtime initialization failed: {0}")]
    Init(String),

    #[error("failed to load workflow: {0}")]
    WorkflowLoad(String),

    #[error("unsupported memory location: {0}")]
    UnsupportedLocation(String),

    #[error("unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("transform failed: {0}")]
    Transform(String),

    #[error("number of transform results ({got}) doesn't match number of requests ({expected})")]
    ResponseCountMismatch { expected: usize, got: usize },

    #[error("invalid model configuration: {0}")]
    Config(String),

    #[error("{0}")]
    InvalidArgument(String),
}

impl Error {
    /// Whether this error fails one request without touching its siblings.
    pub fn is_per_request(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedLocation(_)
                | Error::UnsupportedDtype(_)
                | Error::Transform(_)
                | Error::InvalidArgument(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
