use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::TaxonomySettings;
use crate::core::taxonomy::{SynonymTaxonomy, TaxonomyDocument};
use crate::models::SynonymCandidate;

/// Cache key of the organisation-independent taxonomy
const GLOBAL_KEY: &str = "_global";

const BUILTIN_TAXONOMY: &str = include_str!("../../data/skill_taxonomy.json");

/// Errors that can occur while loading a taxonomy
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid taxonomy JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Taxonomy source error: {0}")]
    Source(String),

    #[error("Taxonomy cache error: {0}")]
    Cache(String),
}

/// Where taxonomies come from
#[async_trait]
pub trait TaxonomySource: Send + Sync {
    async fn load_base(&self) -> Result<TaxonomyDocument, TaxonomyError>;

    /// Organisation-specific additions; `None` when the organisation has none
    async fn load_overlay(
        &self,
        organization_id: &str,
    ) -> Result<Option<TaxonomyDocument>, TaxonomyError>;
}

/// Taxonomy compiled into the binary, no overlays
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinTaxonomySource;

#[async_trait]
impl TaxonomySource for BuiltinTaxonomySource {
    async fn load_base(&self) -> Result<TaxonomyDocument, TaxonomyError> {
        Ok(serde_json::from_str(BUILTIN_TAXONOMY)?)
    }

    async fn load_overlay(&self, _organization_id: &str) -> Result<Option<TaxonomyDocument>, TaxonomyError> {
        Ok(None)
    }
}

/// Base taxonomy from a JSON file, overlays from `<overlay_dir>/<organization_id>.json`
#[derive(Debug, Clone)]
pub struct JsonFileTaxonomySource {
    base_path: PathBuf,
    overlay_dir: Option<PathBuf>,
}

impl JsonFileTaxonomySource {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            overlay_dir: None,
        }
    }

    pub fn with_overlay_dir<P: AsRef<Path>>(mut self, overlay_dir: P) -> Self {
        self.overlay_dir = Some(overlay_dir.as_ref().to_path_buf());
        self
    }
}

#[async_trait]
impl TaxonomySource for JsonFileTaxonomySource {
    async fn load_base(&self) -> Result<TaxonomyDocument, TaxonomyError> {
        let json = tokio::fs::read_to_string(&self.base_path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    async fn load_overlay(
        &self,
        organization_id: &str,
    ) -> Result<Option<TaxonomyDocument>, TaxonomyError> {
        let Some(dir) = &self.overlay_dir else {
            return Ok(None);
        };

        if organization_id.is_empty()
            || organization_id.contains(|c: char| c == '/' || c == '\\')
            || organization_id.contains("..")
        {
            return Err(TaxonomyError::Source(format!(
                "invalid organization id: {:?}",
                organization_id
            )));
        }

        let path = dir.join(format!("{}.json", organization_id));
        match tokio::fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Fixed documents held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticTaxonomySource {
    base: TaxonomyDocument,
    overlays: HashMap<String, TaxonomyDocument>,
}

impl StaticTaxonomySource {
    pub fn new(base: TaxonomyDocument) -> Self {
        Self {
            base,
            overlays: HashMap::new(),
        }
    }

    pub fn with_overlay(mut self, organization_id: &str, overlay: TaxonomyDocument) -> Self {
        self.overlays.insert(organization_id.to_string(), overlay);
        self
    }
}

#[async_trait]
impl TaxonomySource for StaticTaxonomySource {
    async fn load_base(&self) -> Result<TaxonomyDocument, TaxonomyError> {
        Ok(self.base.clone())
    }

    async fn load_overlay(
        &self,
        organization_id: &str,
    ) -> Result<Option<TaxonomyDocument>, TaxonomyError> {
        Ok(self.overlays.get(organization_id).cloned())
    }
}

/// Process-wide taxonomy handle
///
/// Caches one merged taxonomy per organisation (plus the global one) and
/// hands out `Arc` snapshots, so matching never waits on a lock. Construct
/// once at startup and share by reference.
pub struct TaxonomyStore {
    source: Arc<dyn TaxonomySource>,
    cache: moka::future::Cache<String, Arc<SynonymTaxonomy>>,
}

impl TaxonomyStore {
    pub fn new(source: Arc<dyn TaxonomySource>, capacity: u64, ttl: Option<Duration>) -> Self {
        let mut builder = moka::future::CacheBuilder::new(capacity).support_invalidation_closures();
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }

        Self {
            source,
            cache: builder.build(),
        }
    }

    /// Store backed by the compiled-in taxonomy
    pub fn builtin() -> Self {
        Self::new(Arc::new(BuiltinTaxonomySource), 64, None)
    }

    /// JSON file source when a path is configured, the built-in taxonomy otherwise
    pub fn from_settings(settings: &TaxonomySettings) -> Self {
        let source: Arc<dyn TaxonomySource> = match &settings.path {
            Some(path) => {
                let mut source = JsonFileTaxonomySource::new(path);
                if let Some(dir) = &settings.overlay_dir {
                    source = source.with_overlay_dir(dir);
                }
                Arc::new(source)
            }
            None => Arc::new(BuiltinTaxonomySource),
        };

        Self::new(source, settings.cache_capacity, settings.ttl())
    }

    /// Taxonomy for an organisation (base merged with its overlay), or the
    /// global taxonomy when `organization_id` is `None`
    pub async fn get(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Arc<SynonymTaxonomy>, TaxonomyError> {
        let key = cache_key(organization_id);
        if let Some(taxonomy) = self.cache.get(&key).await {
            tracing::trace!("Taxonomy cache hit: {}", key);
            return Ok(taxonomy);
        }

        let base = self.global().await?;
        let Some(org) = organization_id else {
            return Ok(base);
        };

        let taxonomy = match self.source.load_overlay(org).await? {
            Some(overlay) => {
                let overlay = SynonymTaxonomy::from_document(&overlay);
                Arc::new(base.as_ref().clone().merged(&overlay))
            }
            None => base,
        };

        self.cache.insert(key, taxonomy.clone()).await;
        tracing::debug!(organization = org, skills = taxonomy.len(), "Loaded organisation taxonomy");
        Ok(taxonomy)
    }

    async fn global(&self) -> Result<Arc<SynonymTaxonomy>, TaxonomyError> {
        if let Some(taxonomy) = self.cache.get(GLOBAL_KEY).await {
            return Ok(taxonomy);
        }

        let document = self.source.load_base().await?;
        let taxonomy = Arc::new(SynonymTaxonomy::from_document(&document));
        self.cache.insert(GLOBAL_KEY.to_string(), taxonomy.clone()).await;

        tracing::info!(skills = taxonomy.len(), "Loaded global skill taxonomy");
        Ok(taxonomy)
    }

    /// Drop and reload one taxonomy. Reloading the global taxonomy drops every
    /// organisation entry too, since they are derived from it.
    pub async fn reload(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Arc<SynonymTaxonomy>, TaxonomyError> {
        match organization_id {
            Some(org) => self.cache.invalidate(&cache_key(Some(org))).await,
            None => self.clear(),
        }

        tracing::info!(organization = organization_id.unwrap_or(GLOBAL_KEY), "Reloading taxonomy");
        self.get(organization_id).await
    }

    /// Overlay approved synonym candidates onto the cached snapshot
    ///
    /// The change lives in the cache only; a reload restores whatever the
    /// source holds. Approving into the global taxonomy drops the cached
    /// organisation entries so they are re-merged from the new base.
    pub async fn apply_approved(
        &self,
        organization_id: Option<&str>,
        candidates: &[SynonymCandidate],
    ) -> Result<Arc<SynonymTaxonomy>, TaxonomyError> {
        let mut taxonomy = self.get(organization_id).await?.as_ref().clone();
        for candidate in candidates {
            taxonomy.apply_candidate(candidate);
        }

        let taxonomy = Arc::new(taxonomy);
        self.cache
            .insert(cache_key(organization_id), taxonomy.clone())
            .await;

        if organization_id.is_none() {
            self.cache
                .invalidate_entries_if(|key, _| key != GLOBAL_KEY)
                .map_err(|e| TaxonomyError::Cache(e.to_string()))?;
        }

        tracing::info!(
            organization = organization_id.unwrap_or(GLOBAL_KEY),
            applied = candidates.len(),
            "Applied approved synonym candidates"
        );
        Ok(taxonomy)
    }

    /// Drop every cached taxonomy
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    pub fn cached_entries(&self) -> u64 {
        self.cache.entry_count()
    }
}

fn cache_key(organization_id: Option<&str>) -> String {
    match organization_id {
        Some(org) => format!("org:{}", org),
        None => GLOBAL_KEY.to_string(),
    }
}
