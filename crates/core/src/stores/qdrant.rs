use crate::identity::point_id;
use crate::models::{ChunkMetadata, CollectionSpec, DistanceMetric, EmbeddedChunk, QueryResult};
use crate::store::{rank_hits, validate_collection_name};
use crate::traits::VectorStore;
use crate::StoreError;
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{json, Value};
use url::Url;

const BACKEND: &str = "qdrant";

pub struct QdrantStore {
    endpoint: Url,
    client: Client,
    metric: DistanceMetric,
}

impl QdrantStore {
    pub fn new(endpoint: &str) -> Result<Self, StoreError> {
        let mut endpoint = Url::parse(endpoint)?;
        if !endpoint.path().ends_with('/') {
            let path = format!("{}/", endpoint.path());
            endpoint.set_path(&path);
        }

        Ok(Self {
            endpoint,
            client: Client::new(),
            metric: DistanceMetric::Cosine,
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self.endpoint.join(path)?)
    }

    async fn collection_metric(&self, collection: &str) -> Result<DistanceMetric, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("collections/{collection}"))?)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionMissing(collection.to_string()));
        }
        let parsed: Value = ensure_success(response).await?.json().await?;
        Ok(parsed
            .pointer("/result/config/params/vectors/distance")
            .and_then(Value::as_str)
            .map(metric_from_name)
            .unwrap_or(self.metric))
    }
}

fn metric_name(metric: DistanceMetric) -> &'static str {
    match metric {
        DistanceMetric::Cosine => "Cosine",
        DistanceMetric::Euclidean => "Euclid",
    }
}

fn metric_from_name(name: &str) -> DistanceMetric {
    match name {
        "Euclid" => DistanceMetric::Euclidean,
        _ => DistanceMetric::Cosine,
    }
}

/// Qdrant reports similarity for cosine and the raw distance for Euclid.
fn score_to_distance(metric: DistanceMetric, score: f64) -> f32 {
    match metric {
        DistanceMetric::Cosine => (1.0 - score).clamp(0.0, 2.0) as f32,
        DistanceMetric::Euclidean => score.max(0.0) as f32,
    }
}

async fn ensure_success(response: Response) -> Result<Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::BackendResponse {
        backend: BACKEND.to_string(),
        details: format!("{status}: {body}"),
    })
}

fn point_payload(record: &EmbeddedChunk) -> Value {
    json!({
        "id": point_id(&record.chunk.id),
        "vector": record.vector,
        "payload": {
            "chunk_id": record.chunk.id,
            "text": record.chunk.text,
            "source": record.chunk.metadata.source,
            "page": record.chunk.metadata.page,
        },
    })
}

fn parse_hits(parsed: &Value, metric: DistanceMetric) -> Vec<QueryResult> {
    parsed
        .pointer("/result")
        .and_then(Value::as_array)
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| {
                    let id = hit.pointer("/payload/chunk_id").and_then(Value::as_str)?;
                    let text = hit
                        .pointer("/payload/text")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let source = hit
                        .pointer("/payload/source")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    let page = hit
                        .pointer("/payload/page")
                        .and_then(Value::as_u64)
                        .unwrap_or_default();
                    let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);

                    Some(QueryResult {
                        id: id.to_string(),
                        text: text.to_string(),
                        metadata: ChunkMetadata {
                            source: source.to_string(),
                            page: page as u32,
                        },
                        distance: score_to_distance(metric, score),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn create_collection(&self, name: &str, spec: &CollectionSpec) -> Result<(), StoreError> {
        validate_collection_name(name)?;
        let url = self.url(&format!("collections/{name}"))?;

        let existing = self.client.get(url.clone()).send().await?;
        if existing.status().is_success() {
            let parsed: Value = existing.json().await?;
            let size = parsed
                .pointer("/result/config/params/vectors/size")
                .and_then(Value::as_u64)
                .unwrap_or_default() as usize;
            if size != spec.dimensions {
                return Err(StoreError::DimensionMismatch {
                    expected: size,
                    actual: spec.dimensions,
                });
            }
            return Ok(());
        }
        if existing.status() != StatusCode::NOT_FOUND {
            ensure_success(existing).await?;
        }

        let response = self
            .client
            .put(url)
            .json(&json!({
                "vectors": {
                    "size": spec.dimensions,
                    "distance": metric_name(spec.metric),
                },
            }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool, StoreError> {
        validate_collection_name(name)?;
        let response = self
            .client
            .delete(self.url(&format!("collections/{name}"))?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        let parsed: Value = ensure_success(response).await?.json().await?;
        Ok(parsed.pointer("/result").and_then(Value::as_bool).unwrap_or(true))
    }

    async fn add(&self, collection: &str, records: &[EmbeddedChunk]) -> Result<(), StoreError> {
        validate_collection_name(collection)?;
        if records.is_empty() {
            return Ok(());
        }

        let points = records.iter().map(point_payload).collect::<Vec<_>>();
        let response = self
            .client
            .put(self.url(&format!("collections/{collection}/points?wait=true"))?)
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionMissing(collection.to_string()));
        }
        ensure_success(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        k: usize,
    ) -> Result<Vec<QueryResult>, StoreError> {
        validate_collection_name(collection)?;
        let metric = self.collection_metric(collection).await?;

        let response = self
            .client
            .post(self.url(&format!("collections/{collection}/points/search"))?)
            .json(&json!({
                "vector": vector,
                "limit": k,
                "with_payload": true,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionMissing(collection.to_string()));
        }
        let parsed: Value = ensure_success(response).await?.json().await?;
        Ok(rank_hits(parse_hits(&parsed, metric), k))
    }

    async fn count(&self, collection: &str) -> Result<usize, StoreError> {
        validate_collection_name(collection)?;
        let response = self
            .client
            .post(self.url(&format!("collections/{collection}/points/count"))?)
            .json(&json!({ "exact": true }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionMissing(collection.to_string()));
        }
        let parsed: Value = ensure_success(response).await?.json().await?;
        parsed
            .pointer("/result/count")
            .and_then(Value::as_u64)
            .map(|count| count as usize)
            .ok_or_else(|| StoreError::BackendResponse {
                backend: BACKEND.to_string(),
                details: "count response without result.count".to_string(),
            })
    }
}
