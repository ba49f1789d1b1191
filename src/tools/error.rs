/// Tool execution error types.
///
/// These never cross the dispatcher boundary; they are rendered into the
/// tool-result message so the model can react to them.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ToolError {
    /// Invalid arguments provided to the tool.
    #[error("invalid tool arguments: {0}")]
    InvalidArgs(String),

    /// Tool execution failed with a message to show the model.
    #[error("tool execution failed: {0}")]
    Execution(String),

    /// Tool not found in registry.
    #[error("tool not found: {0}")]
    NotFound(String),

    /// Tool timed out.
    #[error("tool timed out after {0}ms")]
    Timeout(u64),
}
