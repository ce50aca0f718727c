use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// A setting required by the selected join strategy is missing or out of range.
    ///
    /// Raised before any data is touched.
    pub fn invalid_config(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidConfiguration {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    /// The memory budget cannot accommodate `requested` bytes for `resource`.
    pub fn resource_exhausted(resource: impl Into<String>, requested: u64, remaining: u64) -> Error {
        Error(
            ErrorKind::ResourceExhausted {
                resource: resource.into(),
                requested,
                remaining,
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn worker_pool(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::WorkerPool {
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    /// Returns `true` for configuration errors.
    pub fn is_config_error(&self) -> bool {
        matches!(self.kind(), ErrorKind::InvalidConfiguration { .. })
    }

    /// Returns `true` when the error was caused by an exhausted memory budget.
    pub fn is_resource_exhausted(&self) -> bool {
        matches!(self.kind(), ErrorKind::ResourceExhausted { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid configuration {name}: {message}")]
    InvalidConfiguration { name: String, message: String },

    #[error("resource exhausted: {resource} requires {requested} bytes, {remaining} available")]
    ResourceExhausted {
        resource: String,
        requested: u64,
        remaining: u64,
    },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("worker pool error: {message}")]
    WorkerPool { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(_: std::convert::Infallible) -> Self {
        Error::invalid_operation("conversion")
    }
}
