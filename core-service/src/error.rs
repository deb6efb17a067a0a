use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Library error: {0}")]
    Library(#[from] core_library::LibraryError),
}

pub type Result<T> = std::result::Result<T, CoreError>;
