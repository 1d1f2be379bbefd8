use crate::{Tool, ToolExecutionResult, ToolSpec};
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

/// Caller-visible registry failures.
///
/// These are usage errors and are never folded into a [`ToolExecutionResult`].
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Tool '{0}' already registered")]
    DuplicateTool(String),

    #[error("Tool '{0}' not found")]
    NotFound(String),
}

/// Registry for estimator tools.
///
/// The registry is responsible for:
/// - Registering tools under unique names
/// - Looking up tools by name
/// - Executing tools with timing and fault isolation
/// - Providing tool specifications for discovery, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    ///
    /// Fails with [`RegistryError::DuplicateTool`] if the name is taken; the
    /// earlier registration is left untouched.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), RegistryError> {
        let name = tool.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(RegistryError::DuplicateTool(name));
        }

        self.by_name.insert(name.clone(), self.tools.len());
        self.tools.push(tool);
        debug!(tool_name = %name, "Registered tool");
        Ok(())
    }

    /// Get a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.by_name.get(name).map(|&idx| &self.tools[idx])
    }

    /// Tool specifications for client-side discovery.
    pub fn list_tools(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|tool| tool.spec()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool by name.
    ///
    /// An unknown name fails immediately with [`RegistryError::NotFound`].
    /// Once the tool is found, every outcome of its body, including a panic,
    /// is reported through the returned [`ToolExecutionResult`].
    pub async fn execute_tool(
        &self,
        name: &str,
        input: Value,
    ) -> Result<ToolExecutionResult, RegistryError> {
        let tool = self
            .get_tool(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        debug!(tool_name = %name, "Executing tool");
        let start = Instant::now();
        let outcome = AssertUnwindSafe(tool.execute(input)).catch_unwind().await;
        let execution_time_ms = start.elapsed().as_secs_f64() * 1000.0;

        let result = match outcome {
            Ok(Ok(output)) => {
                info!(tool_name = %name, execution_time_ms, "Tool executed successfully");
                ToolExecutionResult::succeeded(name, output, execution_time_ms)
            }
            Ok(Err(e)) => {
                error!(tool_name = %name, error = %e, "Tool failed");
                ToolExecutionResult::failed(name, e.to_string(), execution_time_ms)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!(tool_name = %name, error = %message, "Tool panicked");
                ToolExecutionResult::failed(name, message, execution_time_ms)
            }
        };

        Ok(result)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Tool panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Tool panicked: {}", s)
    } else {
        "Tool panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ToolError, ToolOutput};
    use async_trait::async_trait;

    struct EchoTool {
        name: &'static str,
        description: &'static str,
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(&self, input: Value) -> crate::Result<ToolOutput> {
            let mut out = ToolOutput::new();
            out.insert("echo".to_string(), input);
            Ok(out)
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "failing"
        }

        fn description(&self) -> &str {
            "Always rejects its input"
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({})
        }

        async fn execute(&self, _input: Value) -> crate::Result<ToolOutput> {
            Err(ToolError::InvalidInput("speed_kph must be positive".to_string()))
        }
    }

    struct PanickingTool;

    #[async_trait]
    impl Tool for PanickingTool {
        fn name(&self) -> &str {
            "panicking"
        }

        fn description(&self) -> &str {
            "Panics mid-computation"
        }

        fn input_schema(&self) -> Value {
            serde_json::json!({})
        }

        async fn execute(&self, _input: Value) -> crate::Result<ToolOutput> {
            panic!("coefficient table missing");
        }
    }

    fn echo(name: &'static str, description: &'static str) -> Arc<dyn Tool> {
        Arc::new(EchoTool { name, description })
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("echo", "first")).unwrap();

        let err = registry.register(echo("echo", "second")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTool(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get_tool("echo").unwrap().description(), "first");
    }

    #[test]
    fn test_list_tools_in_registration_order() {
        let mut registry = ToolRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.register(echo(name, "d")).unwrap();
        }

        let names: Vec<String> = registry.list_tools().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(registry.names(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_get_tool_missing_is_none() {
        let registry = ToolRegistry::new();
        assert!(registry.get_tool("nope").is_none());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("echo", "d")).unwrap();

        let result = registry
            .execute_tool("echo", serde_json::json!({"x": 1}))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.tool_name, "echo");
        assert!(result.error_message.is_none());
        assert_eq!(result.result.unwrap()["echo"]["x"], 1);
        assert!(result.execution_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_execute_error_is_isolated() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(FailingTool)).unwrap();

        let result = registry
            .execute_tool("failing", Value::Null)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.result.is_none());
        let message = result.error_message.unwrap();
        assert!(message.contains("speed_kph must be positive"));
        assert!(result.execution_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_execute_panic_is_isolated() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(PanickingTool)).unwrap();
        registry.register(echo("echo", "d")).unwrap();

        let result = registry
            .execute_tool("panicking", Value::Null)
            .await
            .unwrap();
        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("coefficient table missing"));

        // A panicking tool does not poison the rest of the batch.
        let next = registry.execute_tool("echo", Value::Null).await.unwrap();
        assert!(next.success);
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_is_not_found() {
        let registry = ToolRegistry::new();
        let err = registry
            .execute_tool("missing", Value::Null)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(ref n) if n == "missing"));
    }

    #[test]
    fn test_result_serialization_omits_absent_fields() {
        let failed = ToolExecutionResult::failed("t", "boom", 1.5);
        let json = serde_json::to_value(&failed).unwrap();
        assert!(json.get("result").is_none());
        assert_eq!(json["error_message"], "boom");
        assert_eq!(json["success"], false);
    }
}
