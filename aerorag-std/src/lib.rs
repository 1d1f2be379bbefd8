//! Built-in estimator tools for aerorag
//!
//! Provides the estimators registered at process start:
//! - `estimate_downforce`: downforce for an airfoil at a speed and geometry
//! - `predict_flow_influence`: wake and vortex effects on downstream parts

mod downforce;
mod flow;

pub use downforce::DownforceEstimatorTool;
pub use flow::FlowInfluencePredictorTool;

use aerorag_tools::{RegistryError, Tool, ToolRegistry};
use std::sync::Arc;
use tracing::info;

/// The built-in tools, in registration order.
pub fn builtin_tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(DownforceEstimatorTool::new()),
        Arc::new(FlowInfluencePredictorTool::new()),
    ]
}

/// A registry holding every built-in tool.
///
/// Callers may register additional tools afterwards; names must stay unique.
pub fn default_registry() -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    for tool in builtin_tools() {
        registry.register(tool)?;
    }
    info!(tool_count = registry.len(), "Tool registry initialized");
    Ok(registry)
}
