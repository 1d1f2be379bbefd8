//! Wires the retrieval engine and the tool registry together the way a
//! front end would: both built once, then shared by reference.

use aerorag::prelude::*;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn local_memory_config() -> Config {
    let mut config = Config::default();
    config.embedding.provider = EmbeddingProviderKind::Local;
    config.embedding.dimension = 128;
    config.storage.storage_mode = StorageMode::Memory;
    config.rag.similarity_threshold = 0.0;
    config
}

struct WingLoadingTool;

#[async_trait]
impl Tool for WingLoadingTool {
    fn name(&self) -> &str {
        "wing_loading"
    }

    fn description(&self) -> &str {
        "Divide a load by a planform area"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "required": ["load_kg", "area_m2"]})
    }

    async fn execute(&self, input: Value) -> aerorag_tools::Result<ToolOutput> {
        let area = input["area_m2"]
            .as_f64()
            .filter(|a| *a > 0.0)
            .ok_or_else(|| ToolError::InvalidInput("area_m2 must be positive".to_string()))?;
        let load = input["load_kg"].as_f64().unwrap_or(0.0);

        let mut output = ToolOutput::new();
        output.insert("loading_kg_per_m2".to_string(), json!(load / area));
        Ok(output)
    }
}

#[tokio::test]
async fn ingest_then_search_ranks_exact_description_first() -> anyhow::Result<()> {
    init_tracing();
    let engine = RagEngine::new(&local_memory_config()).await?;

    let references = [
        ("NACA 0012", "NACA 0012 thin symmetric low-camber airfoil"),
        ("S1223", "S1223 thick high-camber high-lift airfoil"),
    ];
    for (name, text) in references {
        let id = Document::slug_id("airfoil", name);
        let mut metadata = Metadata::new();
        metadata.insert("airfoil_name".to_string(), MetadataValue::from(name));
        engine.add_reference(&id, text, metadata).await?;
    }

    // Re-ingestion with the same derived ids is rejected, not duplicated.
    let again = engine
        .add_reference(
            &Document::slug_id("airfoil", "NACA 0012"),
            references[0].1,
            Metadata::new(),
        )
        .await
        .unwrap_err();
    assert!(again.is_duplicate());
    assert_eq!(engine.count().await?, 2);

    let results = engine.search_similar(references[0].1, None).await?;
    assert_eq!(results[0].document.id, "airfoil_naca_0012");
    assert_eq!(results[0].rank, 1);
    assert_eq!(
        results[0].document.metadata["airfoil_name"],
        MetadataValue::from("NACA 0012")
    );
    for pair in results.windows(2) {
        assert!(pair[0].score >= pair[1].score);
        assert_eq!(pair[1].rank, pair[0].rank + 1);
    }
    Ok(())
}

#[tokio::test]
async fn registry_accepts_late_registration_and_isolates_failures() {
    init_tracing();
    let mut registry = default_registry().unwrap();
    registry.register(Arc::new(WingLoadingTool)).unwrap();
    assert_eq!(
        registry.names(),
        vec!["estimate_downforce", "predict_flow_influence", "wing_loading"]
    );

    let ok = registry
        .execute_tool("wing_loading", json!({"load_kg": 90.0, "area_m2": 0.3}))
        .await
        .unwrap();
    assert!(ok.success);

    let failed = registry
        .execute_tool("wing_loading", json!({"load_kg": 90.0, "area_m2": 0}))
        .await
        .unwrap();
    assert!(!failed.success);
    assert_eq!(
        failed.error_message.as_deref(),
        Some("Invalid input: area_m2 must be positive")
    );

    assert!(registry.execute_tool("unknown", json!({})).await.is_err());
}
