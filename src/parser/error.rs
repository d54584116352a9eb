
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("empty reply")]
    Empty,

    #[error("no [THOUGHT]/[ACTION]/[ANSWER] markers found")]
    NoMarkers,

    #[error("invalid JSON envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),
}
