use datafusion_common::error::DataFusionError;
use std::{
    backtrace::Backtrace,
    fmt::{self, Debug, Display, Formatter},
    io, panic,
};
use tokio::task::JoinError;

use super::ErrorCode;

pub type UpsertResult<T, E = Box<UpsertError>> = Result<T, E>;

pub struct UpsertError {
    pub code: ErrorCode,
    pub context: String,
    cause: Option<WrappedError>,
    backtrace: Backtrace,
}

impl Debug for UpsertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpsertError")
            .field("code", &self.code)
            .field("context", &self.context)
            .field("cause", &self.cause)
            .finish()
    }
}

impl Display for UpsertError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.context)?;
        if let Some(cause) = &self.cause {
            if !self.context.is_empty() {
                write!(f, ": ")?;
            }
            write!(f, "{cause}")?
        }
        Ok(())
    }
}

impl std::error::Error for UpsertError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_ref().map(|e| e as &dyn std::error::Error)
    }
}

impl UpsertError {
    pub fn new(code: ErrorCode, context: impl Into<String>) -> Self {
        UpsertError {
            code,
            context: context.into(),
            cause: None,
            backtrace: Backtrace::capture(),
        }
    }

    pub fn new_with_forced_backtrace(code: ErrorCode, context: impl Into<String>) -> Self {
        UpsertError {
            code,
            context: context.into(),
            cause: None,
            backtrace: Backtrace::force_capture(),
        }
    }

    /// True if this error contains a backtrace.
    pub fn has_backtrace(&self) -> bool {
        self.backtrace.status() == std::backtrace::BacktraceStatus::Captured
    }

    /// Returns the backtrace as a string, if available.
    pub fn get_backtrace(&self) -> Option<String> {
        if self.has_backtrace() {
            Some(self.backtrace.to_string())
        } else {
            None
        }
    }

    /// Returns a pretty-printed version of this error, prefixed by the error
    /// code.
    pub fn pretty(&self) -> String {
        let mut s = format!("upsert{}: {}", self.code, self);
        if let Some(backtrace) = self.get_backtrace() {
            s.push_str(&format!("\n{backtrace}"));
        }
        s
    }

    /// Adds a cause to this error, replacing the existing cause if any
    ///
    /// Note: if you attach a cause to an error, make sure you don't format the
    /// cause into the [Self::context] for this error, as then the cause would
    /// be double printed when formatting this error.
    pub fn with_cause(self, cause: impl Into<WrappedError>) -> Self {
        UpsertError {
            cause: Some(cause.into()),
            ..self
        }
    }

    pub fn with_context(self, context: impl Into<String>) -> Self {
        UpsertError {
            context: context.into(),
            ..self
        }
    }

    pub fn cause(&self) -> Option<&WrappedError> {
        self.cause.as_ref()
    }
}

/// Dynamically typed wrapper to allow propagating structured error info
///
/// A wrapped error can be any type that may provide potentially useful
/// debugging information. These are generally error types from third-party
/// libraries, such as Arrow, DataFusion, or the ADBC driver manager.
///
/// Note: you don't have to add all third-party library error types here, only
/// those that may be useful for debugging or error handling. If not, then just
/// use the [Generic(String)] variant.
#[derive(Debug)]
#[non_exhaustive]
pub enum WrappedError {
    Arrow(arrow::error::ArrowError),
    Datafusion(DataFusionError),
    Adbc(adbc_core::error::Error),
    SerdeJson(serde_json::Error),
    Toml(toml::de::Error),
    Io(io::Error),
    Generic(String),
}

impl Display for WrappedError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            WrappedError::Arrow(e) => write!(f, "{e}"),
            WrappedError::Datafusion(e) => write!(f, "{e}"),
            WrappedError::Adbc(e) => write!(f, "{}", e.message),
            WrappedError::SerdeJson(e) => write!(f, "{e}"),
            WrappedError::Toml(e) => write!(f, "{e}"),
            WrappedError::Io(e) => write!(f, "{e}"),
            WrappedError::Generic(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for WrappedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WrappedError::Datafusion(e) => Some(e),
            WrappedError::Arrow(e) => Some(e),
            WrappedError::Io(e) => Some(e),
            _ => None,
        }
    }
}

// --- Implicit conversions ---

impl From<JoinError> for UpsertError {
    fn from(e: JoinError) -> Self {
        if e.is_cancelled() {
            UpsertError::new(ErrorCode::OperationCanceled, "Operation cancelled")
        } else if e.is_panic() {
            panic::resume_unwind(e.into_panic());
        } else {
            // as of today, this is unreachable, but we keep it for future-proofing
            UpsertError::new(ErrorCode::Unexpected, format!("Join error: {e}"))
        }
    }
}

impl From<JoinError> for Box<UpsertError> {
    fn from(e: JoinError) -> Self {
        Box::new(e.into())
    }
}

impl From<arrow::error::ArrowError> for UpsertError {
    fn from(e: arrow::error::ArrowError) -> Self {
        UpsertError::new(ErrorCode::ArrowError, "Arrow error").with_cause(WrappedError::Arrow(e))
    }
}

impl From<arrow::error::ArrowError> for Box<UpsertError> {
    fn from(e: arrow::error::ArrowError) -> Self {
        Box::new(e.into())
    }
}

impl From<arrow::error::ArrowError> for WrappedError {
    fn from(e: arrow::error::ArrowError) -> Self {
        WrappedError::Arrow(e)
    }
}

/// Errors coming out of the driver manager are attributed to the destination.
impl From<adbc_core::error::Error> for UpsertError {
    fn from(e: adbc_core::error::Error) -> Self {
        UpsertError::new(
            ErrorCode::ConnectionError,
            format!("Destination error ({:?})", e.status),
        )
        .with_cause(WrappedError::Adbc(e))
    }
}

impl From<adbc_core::error::Error> for Box<UpsertError> {
    fn from(e: adbc_core::error::Error) -> Self {
        Box::new(e.into())
    }
}

impl From<adbc_core::error::Error> for WrappedError {
    fn from(e: adbc_core::error::Error) -> Self {
        WrappedError::Adbc(e)
    }
}

impl From<io::Error> for Box<UpsertError> {
    fn from(e: io::Error) -> Self {
        Box::new(
            UpsertError::new(ErrorCode::IoError, "IO error").with_cause(WrappedError::Io(e)),
        )
    }
}

impl From<io::Error> for WrappedError {
    fn from(e: io::Error) -> Self {
        WrappedError::Io(e)
    }
}

impl From<serde_json::Error> for UpsertError {
    fn from(e: serde_json::Error) -> Self {
        UpsertError::new(ErrorCode::SerializationError, "JSON error")
            .with_cause(WrappedError::SerdeJson(e))
    }
}

impl From<serde_json::Error> for Box<UpsertError> {
    fn from(e: serde_json::Error) -> Self {
        Box::new(e.into())
    }
}

impl From<toml::de::Error> for UpsertError {
    fn from(e: toml::de::Error) -> Self {
        UpsertError::new(ErrorCode::InvalidConfig, "Invalid job file")
            .with_cause(WrappedError::Toml(e))
    }
}

impl From<toml::de::Error> for Box<UpsertError> {
    fn from(e: toml::de::Error) -> Self {
        Box::new(e.into())
    }
}

impl From<DataFusionError> for UpsertError {
    fn from(err: DataFusionError) -> Self {
        match err {
            // Allow "tunneling" UpsertErrors through DataFusionError, e.g. from
            // table providers or UDFs that return our own errors.
            DataFusionError::External(e) if e.is::<UpsertError>() => {
                *e.downcast::<UpsertError>().expect("e.is::<UpsertError>()")
            }
            DataFusionError::ArrowError(ae, _) => {
                UpsertError::new(ErrorCode::ArrowError, "Arrow error")
                    .with_cause(WrappedError::Arrow(ae))
            }
            DataFusionError::IoError(ie) => {
                UpsertError::new(ErrorCode::IoError, "IO error").with_cause(WrappedError::Io(ie))
            }
            DataFusionError::SchemaError(_, _) => {
                UpsertError::new(ErrorCode::SchemaMismatch, "Schema error")
                    .with_cause(WrappedError::Datafusion(err))
            }
            DataFusionError::Context(ref context, _) => {
                let context = context.clone();
                UpsertError::new(ErrorCode::EngineError, context)
                    .with_cause(WrappedError::Datafusion(err))
            }
            _ => UpsertError::new(ErrorCode::EngineError, "Dataframe engine error")
                .with_cause(WrappedError::Datafusion(err)),
        }
    }
}

impl From<DataFusionError> for Box<UpsertError> {
    fn from(e: DataFusionError) -> Self {
        Box::new(e.into())
    }
}

impl From<DataFusionError> for WrappedError {
    fn from(e: DataFusionError) -> Self {
        WrappedError::Datafusion(e)
    }
}

/// Convert UpsertError to DataFusionError, so that it can be propagated
/// through DataFusion, e.g. from a custom table provider.
impl From<Box<UpsertError>> for DataFusionError {
    fn from(e: Box<UpsertError>) -> Self {
        DataFusionError::External(e)
    }
}
