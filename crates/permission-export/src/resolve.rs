//! Document resolution
//!
//! Turns names into parsed, shared documents. Reads are chunked to the
//! store's per-call limit and run concurrently; every document is fetched
//! and parsed at most once per run.

use permission_engine::normalize::{parse_document, records_of};
use permission_engine::{AccessDocument, DocumentKind, EngineError};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::ExportConfig;
use crate::error::{absent_if_not_found, ExportResult, StoreError};
use crate::retry::{with_store_retry, RetryConfig};
use crate::store::{MetadataStore, ObjectSchema};

/// Outcome of resolving one name.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The document was read and parsed.
    Found(Arc<AccessDocument>),
    /// The document was read but could not be parsed.
    Malformed(EngineError),
    /// The store has no document by that name.
    Missing,
}

/// Resolves document names through a [`MetadataStore`], caching per run.
pub struct DocumentResolver {
    store: Arc<dyn MetadataStore>,
    read_chunk_size: usize,
    semaphore: Arc<Semaphore>,
    retry: RetryConfig,
    resolved: HashMap<(DocumentKind, String), Resolution>,
}

impl std::fmt::Debug for DocumentResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentResolver")
            .field("read_chunk_size", &self.read_chunk_size)
            .field("resolved", &self.resolved.len())
            .finish()
    }
}

impl DocumentResolver {
    /// Create a resolver with an empty cache.
    pub fn new(store: Arc<dyn MetadataStore>, config: &ExportConfig) -> Self {
        Self {
            store,
            read_chunk_size: config.read_chunk_size.max(1),
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            retry: config.retry.clone(),
            resolved: HashMap::new(),
        }
    }

    /// Resolve documents of one kind by name.
    ///
    /// Returns the documents that were found, keyed by name. Missing and
    /// malformed documents are left out; [`lookup`](Self::lookup) tells them
    /// apart. Store failures abort resolution.
    pub async fn resolve(
        &mut self,
        kind: DocumentKind,
        names: &[String],
    ) -> ExportResult<HashMap<String, Arc<AccessDocument>>> {
        let mut seen = HashSet::new();
        let pending: Vec<String> = names
            .iter()
            .filter(|name| !self.resolved.contains_key(&(kind, (*name).clone())))
            .filter(|name| seen.insert(name.as_str()))
            .cloned()
            .collect();

        if !pending.is_empty() {
            tracing::debug!(
                kind = %kind,
                names = pending.len(),
                chunk_size = self.read_chunk_size,
                "Reading documents"
            );

            let mut tasks = JoinSet::new();
            for chunk in pending.chunks(self.read_chunk_size) {
                let chunk = chunk.to_vec();
                let store = Arc::clone(&self.store);
                let semaphore = Arc::clone(&self.semaphore);
                let retry = self.retry.clone();

                tasks.spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| StoreError::Backend(e.to_string()))?;
                    let response = with_store_retry(&retry, "read_documents", || {
                        let store = Arc::clone(&store);
                        let chunk = chunk.clone();
                        async move { store.read_documents(kind, &chunk).await }
                    })
                    .await;
                    let response = match response {
                        Err(StoreError::NotFound { .. }) => Value::Null,
                        other => other?,
                    };
                    Ok::<_, StoreError>((chunk, response))
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (chunk, response) = joined
                    .map_err(|e| StoreError::Backend(format!("read task failed: {}", e)))??;
                self.absorb(kind, &chunk, &response)?;
            }
        }

        Ok(names
            .iter()
            .filter_map(|name| match self.resolved.get(&(kind, name.clone())) {
                Some(Resolution::Found(doc)) => Some((name.clone(), Arc::clone(doc))),
                _ => None,
            })
            .collect())
    }

    /// Outcome for a name. Names never resolved read as missing.
    pub fn lookup(&self, kind: DocumentKind, name: &str) -> Resolution {
        self.resolved
            .get(&(kind, name.to_string()))
            .cloned()
            .unwrap_or(Resolution::Missing)
    }

    /// Describe objects concurrently, keeping the ones the store knows.
    pub async fn describe_objects<I>(
        &self,
        names: I,
    ) -> ExportResult<HashMap<String, ObjectSchema>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut tasks = JoinSet::new();
        for name in names.into_iter().collect::<HashSet<_>>() {
            let store = Arc::clone(&self.store);
            let semaphore = Arc::clone(&self.semaphore);
            let retry = self.retry.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
                let schema = absent_if_not_found(
                    with_store_retry(&retry, "describe_object", || {
                        let store = Arc::clone(&store);
                        let name = name.clone();
                        async move { store.describe_object(&name).await }
                    })
                    .await,
                )?;
                if schema.is_none() {
                    tracing::debug!(object = %name, "Object not described by store");
                }
                Ok::<_, StoreError>(schema)
            });
        }

        let mut schemas = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            let schema = joined
                .map_err(|e| StoreError::Backend(format!("describe task failed: {}", e)))??;
            if let Some(schema) = schema {
                schemas.insert(schema.name.clone(), schema);
            }
        }
        Ok(schemas)
    }

    fn absorb(
        &mut self,
        kind: DocumentKind,
        chunk: &[String],
        response: &Value,
    ) -> ExportResult<()> {
        let values = records_of(response).ok_or_else(|| EngineError::MalformedDocument {
            kind,
            reason: format!("read response is not a document or list: {}", response),
        })?;

        for value in values {
            match parse_document(kind, value) {
                Ok(document) => {
                    self.resolved.insert(
                        (kind, document.full_name.clone()),
                        Resolution::Found(Arc::new(document)),
                    );
                }
                Err(e) => match value.get("fullName").and_then(Value::as_str) {
                    Some(name) if !name.is_empty() => {
                        tracing::warn!(kind = %kind, name, error = %e, "Malformed document");
                        self.resolved
                            .insert((kind, name.to_string()), Resolution::Malformed(e));
                    }
                    _ => {
                        tracing::warn!(kind = %kind, error = %e, "Skipping unnamed document");
                    }
                },
            }
        }

        for name in chunk {
            self.resolved
                .entry((kind, name.clone()))
                .or_insert_with(|| {
                    tracing::warn!(kind = %kind, name = %name, "Document not found");
                    Resolution::Missing
                });
        }
        Ok(())
    }
}
