use crate::cache::SingleFlight;
use crate::feedback::{FeedbackLog, FeedbackRecord};
use crate::loader::{parse_catalog, read_optional, read_records, sample_products, SampleProduct};
use prodsim_core::{
    Catalog, ClientMatches, ClientPage, Error, EvalSet, EvalSetConfig, MatchFilter, MatchingConfig,
    MatchingIndex, MatchingPair, MatchingProduct, Result, ScoreScale, SearchResults, Signals,
    SimilarResults, SimilarityMode,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// File layout and engine settings for one data directory
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub catalog_file: String,
    /// Read by the sample endpoint when `catalog_file` is missing
    pub legacy_catalog_file: String,
    pub matching_products_file: String,
    pub matching_pairs_file: String,
    pub feedback_file: String,
    pub presentation: ScoreScale,
    pub eval: EvalSetConfig,
    pub matching: MatchingConfig,
}

impl DataConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            catalog_file: "products.jsonl".to_string(),
            legacy_catalog_file: "meta_Cell_Phones_and_Accessories_sample.jsonl".to_string(),
            matching_products_file: "matchings_products.jsonl".to_string(),
            matching_pairs_file: "matchings_pairs.jsonl".to_string(),
            feedback_file: "eval_feedback.jsonl".to_string(),
            presentation: ScoreScale::PRESENTATION,
            eval: EvalSetConfig::default(),
            matching: MatchingConfig::default(),
        }
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.data_dir.join(file)
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self::new("./data")
    }
}

/// Owns the data directory: lazily built catalog and matching caches plus
/// the feedback log
pub struct DataManager {
    config: DataConfig,
    catalog: SingleFlight<Catalog>,
    matchings: SingleFlight<MatchingIndex>,
    feedback: Arc<FeedbackLog>,
}

impl DataManager {
    pub fn new(config: DataConfig) -> Self {
        let feedback = Arc::new(FeedbackLog::new(config.path(&config.feedback_file)));
        Self {
            config,
            catalog: SingleFlight::new(),
            matchings: SingleFlight::new(),
            feedback,
        }
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DataConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn feedback_log(&self) -> &FeedbackLog {
        &self.feedback
    }

    /// The embedded catalog, loaded on first use and kept for the process
    /// lifetime. A missing catalog file yields an empty catalog.
    pub async fn catalog(&self) -> Result<Arc<Catalog>> {
        self.catalog.get_or_build(|| self.load_catalog()).await
    }

    async fn load_catalog(&self) -> Result<Catalog> {
        let path = self.config.path(&self.config.catalog_file);
        let Some(raw) = read_optional(&path).await? else {
            warn!("Catalog {} not found, serving an empty catalog", path.display());
            return Ok(Catalog::default());
        };

        let catalog = tokio::task::spawn_blocking(move || Catalog::new(parse_catalog(&raw)))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?;
        info!("Catalog loaded: {} products from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    /// The matching index. With `refresh`, the cached index is dropped first
    /// and this call (and every later one) sees a fresh build.
    pub async fn matchings(&self, refresh: bool) -> Result<Arc<MatchingIndex>> {
        if refresh {
            info!("Matching cache invalidated");
            self.matchings.invalidate().await;
        }
        self.matchings.get_or_build(|| self.load_matchings()).await
    }

    async fn load_matchings(&self) -> Result<MatchingIndex> {
        let products = read_records(
            &self.config.path(&self.config.matching_products_file),
            MatchingProduct::from_value,
        )
        .await?;
        let pairs = read_records(
            &self.config.path(&self.config.matching_pairs_file),
            MatchingPair::from_value,
        )
        .await?;

        let config = self.config.matching;
        tokio::task::spawn_blocking(move || MatchingIndex::build(&products, &pairs, &config))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        mode: SimilarityMode,
        signals: Option<Signals>,
    ) -> Result<SearchResults> {
        Ok(self.catalog().await?.search(query, limit, mode, signals))
    }

    pub async fn find_similar(
        &self,
        product_id: &str,
        mode: SimilarityMode,
        limit: usize,
        signals: Option<Signals>,
    ) -> Result<SimilarResults> {
        self.catalog().await?.find_similar(product_id, mode, limit, signals)
    }

    pub async fn eval_set(&self, seed: i64) -> Result<EvalSet> {
        self.catalog().await?.build_eval_set(seed, &self.config.eval)
    }

    /// Validate and persist one evaluation submission.
    pub async fn submit_feedback(
        &self,
        seed: i64,
        base_id: &str,
        selected_ids: Vec<String>,
    ) -> Result<FeedbackRecord> {
        if base_id.trim().is_empty() {
            return Err(Error::InvalidRequest("base_id is required".to_string()));
        }
        if self.catalog().await?.get(base_id).is_none() {
            return Err(Error::ProductNotFound(base_id.to_string()));
        }

        let record = FeedbackRecord::now(seed, base_id.to_string(), selected_ids);
        let log = self.feedback.clone();
        let to_write = record.clone();
        tokio::task::spawn_blocking(move || log.append(&to_write))
            .await
            .map_err(|e| Error::Persistence(e.to_string()))?
            .map_err(|e| Error::Persistence(format!("{e:#}")))?;

        info!("Stored eval feedback for base {} (seed {})", record.base_id, record.seed);
        Ok(record)
    }

    pub async fn list_clients(&self, offset: usize, limit: usize, refresh: bool) -> Result<ClientPage> {
        Ok(self.matchings(refresh).await?.list_clients(offset, limit))
    }

    pub async fn client_matches(
        &self,
        client_id: &str,
        top_k: usize,
        filter: &MatchFilter,
        refresh: bool,
    ) -> Result<ClientMatches> {
        self.matchings(refresh)
            .await?
            .client_matches(client_id, top_k, &self.config.presentation, filter)
    }

    /// Random sample of the raw catalog file, bypassing the embedding cache.
    pub async fn sample_products(&self, query: Option<&str>, limit: usize) -> Result<Vec<SampleProduct>> {
        let primary = self.config.path(&self.config.catalog_file);
        let raw = match read_optional(&primary).await? {
            Some(raw) => raw,
            None => {
                let legacy = self.config.path(&self.config.legacy_catalog_file);
                read_optional(&legacy).await?.unwrap_or_default()
            }
        };
        Ok(sample_products(&raw, query, limit))
    }
}
