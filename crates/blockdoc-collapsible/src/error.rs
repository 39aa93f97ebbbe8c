use thiserror::Error;

#[derive(Debug, Error)]
/// Errors surfaced while activating collapsible sections.
pub enum SectionsError {
    #[error("node type `{0}` is not registered on the editor")]
    /// One of the three section node types was not registered through the editor builder.
    UnregisteredNodeType(&'static str),

    #[error("invalid sections config: {0}")]
    /// The JSON configuration could not be parsed.
    Config(#[from] serde_json::Error),
}
