mod registry;
mod tool;

pub use registry::{RegistryError, ToolRegistry};
pub use tool::{Result, Tool, ToolError, ToolExecutionResult, ToolOutput, ToolSpec};
