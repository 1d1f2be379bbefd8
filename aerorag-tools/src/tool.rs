use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors a tool body reports back to the registry.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// Result mapping produced by a successful tool run.
pub type ToolOutput = Map<String, Value>;

/// Discovery record for a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Outcome of one `execute_tool` call.
///
/// `result` is present only on success and `error_message` only on failure.
/// `execution_time_ms` covers the tool's `execute` call and nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolExecutionResult {
    pub tool_name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ToolOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub execution_time_ms: f64,
}

impl ToolExecutionResult {
    pub fn succeeded(tool_name: impl Into<String>, result: ToolOutput, execution_time_ms: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: true,
            result: Some(result),
            error_message: None,
            execution_time_ms,
        }
    }

    pub fn failed(
        tool_name: impl Into<String>,
        error_message: impl Into<String>,
        execution_time_ms: f64,
    ) -> Self {
        Self {
            tool_name: tool_name.into(),
            success: false,
            result: None,
            error_message: Some(error_message.into()),
            execution_time_ms,
        }
    }
}

/// Capability every estimator implements.
///
/// Tools are registered once at startup and looked up by [`Tool::name`].
/// The registry never lets an `Err` or a panic from [`Tool::execute`] reach
/// its caller; both become a failed [`ToolExecutionResult`].
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique identifier used for lookup and execution.
    fn name(&self) -> &str;

    /// Human-readable description shown during discovery.
    fn description(&self) -> &str;

    /// JSON schema describing the accepted parameters.
    fn input_schema(&self) -> Value;

    /// Run the tool. Malformed input should fail with [`ToolError::InvalidInput`].
    async fn execute(&self, input: Value) -> Result<ToolOutput>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}
