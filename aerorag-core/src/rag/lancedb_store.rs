//! LanceDB vector collection implementation.
//!
//! This module provides integration with LanceDB for embedded, in-process
//! vector storage persisted on disk. Nearest-neighbour search is delegated to
//! LanceDB entirely.

use super::store::{check_dimension, check_metadata, CollectionError, Result, VectorCollection};
use super::types::{DistanceMetric, Document, DocumentRef, Metadata, QueryHit};
use anyhow::Context;
use arrow_array::{
    array::{ArrayRef, FixedSizeListArray, Float32Array, StringArray},
    Array, RecordBatch, RecordBatchIterator,
};
use async_trait::async_trait;
use futures::stream::TryStreamExt;
use lancedb::arrow::arrow_schema::{DataType, Field, Schema};
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{connect, Connection, DistanceType, Table};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const OPEN_RETRIES: u32 = 5;
const OPEN_RETRY_DELAY: Duration = Duration::from_millis(50);

/// LanceDB-backed collection for embedded deployment.
///
/// The table is re-opened per operation so a handle stays valid after
/// [`clear`](VectorCollection::clear) drops and recreates it.
pub struct LanceDbCollection {
    conn: Connection,
    name: String,
    dimension: usize,
    metric: DistanceMetric,
}

impl From<DistanceMetric> for DistanceType {
    fn from(metric: DistanceMetric) -> Self {
        match metric {
            DistanceMetric::Cosine => DistanceType::Cosine,
            DistanceMetric::Dot => DistanceType::Dot,
            DistanceMetric::L2 => DistanceType::L2,
        }
    }
}

impl LanceDbCollection {
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("metadata", DataType::Utf8, false),
        ]))
    }

    /// Opens the named table under `path`, creating it if it does not exist.
    ///
    /// If another process creates the table between the existence check and
    /// our create call, the create fails and we open theirs instead; LanceDB
    /// is the single source of truth for which table wins.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory path where LanceDB should store data
    /// * `name` - Name of the table to use
    /// * `dimension` - Dimension of the embedding vectors
    /// * `metric` - Distance metric used for queries
    pub async fn get_or_create(
        path: &str,
        name: &str,
        dimension: usize,
        metric: DistanceMetric,
    ) -> Result<Self> {
        let conn = connect(path)
            .execute()
            .await
            .context("Failed to connect to LanceDB")?;

        let table_names = conn
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;

        let table = if table_names.iter().any(|t| t == name) {
            conn.open_table(name)
                .execute()
                .await
                .context("Failed to open LanceDB table")?
        } else {
            match conn
                .create_empty_table(name, Self::create_schema(dimension))
                .execute()
                .await
            {
                Ok(table) => {
                    info!(collection = %name, path = %path, "Created collection");
                    table
                }
                Err(create_err) => {
                    debug!(collection = %name, error = %create_err, "Create lost a race, opening");
                    Self::open_after_race(&conn, name)
                        .await
                        .with_context(|| format!("Failed to create LanceDB table: {}", create_err))?
                }
            }
        };

        let stored = Self::stored_dimension(&table).await?;
        if stored != dimension {
            return Err(CollectionError::DimensionMismatch {
                expected: stored,
                actual: dimension,
            });
        }

        debug!(collection = %name, dimension, ?metric, "Opened collection");
        Ok(Self {
            conn,
            name: name.to_string(),
            dimension,
            metric,
        })
    }

    /// Opens a table another caller is creating. Its first commit may land
    /// a moment after our create is refused.
    async fn open_after_race(conn: &Connection, name: &str) -> lancedb::Result<Table> {
        let mut attempt = 0;
        loop {
            match conn.open_table(name).execute().await {
                Ok(table) => return Ok(table),
                Err(e) if attempt < OPEN_RETRIES => {
                    attempt += 1;
                    debug!(collection = %name, attempt, error = %e, "Table not ready yet");
                    tokio::time::sleep(OPEN_RETRY_DELAY).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn stored_dimension(table: &Table) -> Result<usize> {
        let schema = table.schema().await.context("Failed to read table schema")?;
        let field = schema
            .field_with_name("vector")
            .context("Missing 'vector' column")?;
        match field.data_type() {
            DataType::FixedSizeList(_, size) => Ok(*size as usize),
            other => Err(anyhow::anyhow!("Unexpected 'vector' column type: {}", other).into()),
        }
    }

    async fn table(&self) -> Result<Table> {
        let table = self
            .conn
            .open_table(&self.name)
            .execute()
            .await
            .context("Failed to open LanceDB table")?;
        Ok(table)
    }

    fn to_batch(&self, document: Document) -> Result<RecordBatch> {
        let metadata =
            serde_json::to_string(&document.metadata).context("Failed to encode metadata")?;

        let id_array = StringArray::from(vec![document.id.as_str()]);
        let text_array = StringArray::from(vec![document.text.as_str()]);
        let metadata_array = StringArray::from(vec![metadata.as_str()]);

        let vector_values = Float32Array::from(document.vector);
        let vector_array = FixedSizeListArray::new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            self.dimension as i32,
            Arc::new(vector_values),
            None,
        );

        let batch = RecordBatch::try_new(
            Self::create_schema(self.dimension),
            vec![
                Arc::new(id_array) as ArrayRef,
                Arc::new(text_array) as ArrayRef,
                Arc::new(vector_array) as ArrayRef,
                Arc::new(metadata_array) as ArrayRef,
            ],
        )
        .context("Failed to create record batch")?;
        Ok(batch)
    }
}

/// Quotes a string for a LanceDB SQL filter.
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn id_filter(ids: &[String]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| sql_literal(id)).collect();
    format!("id IN ({})", quoted.join(", "))
}

/// Decodes result batches into document refs, pairing each with its
/// `_distance` when the batch came from a vector query.
fn decode_batches(batches: &[RecordBatch]) -> Result<Vec<(DocumentRef, Option<f32>)>> {
    let mut rows = Vec::new();

    for batch in batches {
        let id_array = batch
            .column_by_name("id")
            .context("Missing 'id' column")?
            .as_any()
            .downcast_ref::<StringArray>()
            .context("Failed to cast 'id' to StringArray")?;
        let text_array = batch
            .column_by_name("text")
            .context("Missing 'text' column")?
            .as_any()
            .downcast_ref::<StringArray>()
            .context("Failed to cast 'text' to StringArray")?;
        let metadata_array = batch
            .column_by_name("metadata")
            .context("Missing 'metadata' column")?
            .as_any()
            .downcast_ref::<StringArray>()
            .context("Failed to cast 'metadata' to StringArray")?;
        let distance_array = match batch.column_by_name("_distance") {
            Some(col) => Some(
                col.as_any()
                    .downcast_ref::<Float32Array>()
                    .context("Failed to cast '_distance' to Float32Array")?,
            ),
            None => None,
        };

        for i in 0..batch.num_rows() {
            let metadata: Metadata = serde_json::from_str(metadata_array.value(i))
                .context("Failed to decode stored metadata")?;
            let document = DocumentRef {
                id: id_array.value(i).to_string(),
                text: text_array.value(i).to_string(),
                metadata,
            };
            rows.push((document, distance_array.map(|d| d.value(i))));
        }
    }

    Ok(rows)
}

#[async_trait]
impl VectorCollection for LanceDbCollection {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn metric(&self) -> DistanceMetric {
        self.metric
    }

    async fn add(&self, document: Document) -> Result<()> {
        check_dimension(self.dimension, &document.vector)?;
        check_metadata(&document.metadata)?;

        let table = self.table().await?;
        let id = document.id.clone();
        let batch = self.to_batch(document)?;
        let schema_ref = batch.schema();
        let reader = RecordBatchIterator::new(vec![Ok(batch)], schema_ref);

        // Insert only when no row carries this id, in one commit.
        let mut merge = table.merge_insert(&["id"]);
        merge.when_not_matched_insert_all();
        let outcome = merge
            .execute(Box::new(reader))
            .await
            .context("Failed to add document to LanceDB")?;

        if outcome.num_inserted_rows == 0 {
            return Err(CollectionError::DuplicateId(id));
        }

        debug!(collection = %self.name, id = %id, "Added document");
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<DocumentRef>> {
        let table = self.table().await?;
        let results = table
            .query()
            .only_if(format!("id = {}", sql_literal(id)))
            .limit(1)
            .execute()
            .await
            .context("Failed to execute LanceDB lookup")?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .context("Failed to collect lookup results")?;

        Ok(decode_batches(&batches)?.into_iter().next().map(|(doc, _)| doc))
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<QueryHit>> {
        check_dimension(self.dimension, vector)?;

        let table = self.table().await?;
        if k == 0 || table.count_rows(None).await.context("Failed to count rows")? == 0 {
            return Ok(Vec::new());
        }

        let results = table
            .query()
            .limit(k)
            .nearest_to(vector)
            .context("Failed to build vector query")?
            .distance_type(self.metric.into())
            .execute()
            .await
            .context("Failed to execute LanceDB query")?;

        let batches: Vec<RecordBatch> = results
            .try_collect()
            .await
            .context("Failed to collect query results")?;

        let mut hits = Vec::new();
        for (document, distance) in decode_batches(&batches)? {
            let distance = distance.context("Missing '_distance' column")?;
            hits.push(QueryHit { document, distance });
        }
        Ok(hits)
    }

    async fn delete(&self, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let table = self.table().await?;
        let filter = id_filter(ids);
        let count = table
            .count_rows(Some(filter.clone()))
            .await
            .context("Failed to count documents to delete")?;

        if count > 0 {
            table
                .delete(&filter)
                .await
                .context("Failed to delete documents")?;
        }

        debug!(collection = %self.name, removed = count, "Deleted documents");
        Ok(count)
    }

    async fn clear(&self) -> Result<()> {
        let table_names = self
            .conn
            .table_names()
            .execute()
            .await
            .context("Failed to list LanceDB tables")?;

        if table_names.iter().any(|t| t == &self.name) {
            self.conn
                .drop_table(&self.name, &[])
                .await
                .context("Failed to drop table")?;
        }

        self.conn
            .create_empty_table(&self.name, Self::create_schema(self.dimension))
            .execute()
            .await
            .context("Failed to recreate table")?;

        warn!(collection = %self.name, "Collection cleared");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        let table = self.table().await?;
        let count = table.count_rows(None).await.context("Failed to count rows")?;
        Ok(count)
    }
}
