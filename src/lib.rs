//! hardgates-rs: an enterprise code-hygiene auditor.
//!
//! A repository is cloned (or referenced locally), inventoried once, and
//! run through a catalog of "hard gates" — pattern-driven checks such as
//! structured logging, secret-leak avoidance, and automated test coverage —
//! producing a weighted overall score and a per-gate report. See
//! `SPEC_FULL.md` for the full module map; this crate root only wires the
//! pieces together.

pub mod api;
pub mod core;
pub mod fetch;
pub mod gates;
pub mod inventory;
pub mod patterns;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod store;

use std::sync::Arc;

use crate::core::config::{HardGatesConfig, StorageBackendKind};
use crate::core::errors::Result;
use crate::core::pipeline::Pipeline;
use crate::gates::GateEngine;
use crate::patterns::cache::PatternCache;
use crate::patterns::PatternLibrary;
use crate::registry::JobRegistry;
use crate::store::file_tree::FileTreeStore;
use crate::store::memory::InMemoryStore;
use crate::store::postgres::PostgresStore;
use crate::store::sqlite::SqliteStore;
use crate::store::ResultStore;

/// Everything a running process needs: the engine, the in-memory job
/// registry, and the durable result store, wired once at startup and
/// shared (via `Arc`) across every request and CLI invocation.
pub struct AppState {
    pub config: Arc<HardGatesConfig>,
    pub pipeline: Arc<Pipeline>,
    pub registry: Arc<JobRegistry>,
    pub store: Arc<dyn ResultStore>,
    pub library: Arc<PatternLibrary>,
}

impl AppState {
    /// Build the full dependency graph from a resolved configuration: load
    /// the pattern catalog, connect the configured store backend, and wire
    /// the pipeline over them.
    pub async fn build(config: HardGatesConfig) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(PatternCache::new(config.pattern_cache.clone()));
        let library = Arc::new(match &config.pattern_catalog_path {
            Some(path) => PatternLibrary::load_from_path(path, cache)?,
            None => PatternLibrary::load_default(cache)?,
        });
        let engine = Arc::new(GateEngine::new(Arc::clone(&library)));

        let store: Arc<dyn ResultStore> = build_store(&config).await?;
        let registry = Arc::new(JobRegistry::new());
        let pipeline = Arc::new(Pipeline::new(
            engine,
            Arc::clone(&registry),
            Arc::clone(&store),
            config.performance.max_concurrent_scans,
        ));

        Ok(Self {
            config: Arc::new(config),
            pipeline,
            registry,
            store,
            library,
        })
    }
}

/// Construct the configured [`ResultStore`] backend.
async fn build_store(config: &HardGatesConfig) -> Result<Arc<dyn ResultStore>> {
    let store: Arc<dyn ResultStore> = match config.storage.backend {
        StorageBackendKind::Memory => Arc::new(InMemoryStore::new()),
        StorageBackendKind::File => Arc::new(FileTreeStore::new(&config.storage.connection_string)?),
        StorageBackendKind::Kv => Arc::new(SqliteStore::connect(&config.storage.connection_string).await?),
        StorageBackendKind::Sql => Arc::new(PostgresStore::connect(&config.storage.connection_string).await?),
    };
    Ok(store)
}
