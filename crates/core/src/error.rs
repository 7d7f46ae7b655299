#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoreError {
    /// The channel catalog itself is broken; whoever authors specs must fix it.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A malformed asset descriptor. Recovered inside the analyzer.
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),
}
