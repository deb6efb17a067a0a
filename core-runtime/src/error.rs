use thiserror::Error;

/// Errors raised while configuring or starting the runtime.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required bridge was neither injected nor derivable from the config.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
