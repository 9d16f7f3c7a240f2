//! Client to competitor matching ("smart connections")
//!
//! A pairs list links client products to competitor products. The index
//! groups competitors per client, fills in missing scores from the hashed
//! text embeddings and keeps one entry per competitor id.

use crate::embedder::HashEmbedder;
use crate::presenter::{to_percent, ScoreScale};
use crate::product::{id_field, str_field};
use crate::vector::Vector;
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

/// Largest client page served at once
pub const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    #[default]
    Client,
    Competitor,
}

/// A product from the matching dataset, client or competitor side
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchingProduct {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_path: Option<String>,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<i64>,
    /// Raw score in `[0, 1]`, or the presented score once rescaled
    pub score: Option<f64>,
    /// `score` as a percentage
    pub similarity: Option<f64>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_distractor: Option<bool>,
}

impl MatchingProduct {
    pub fn new(id: impl Into<String>, title: impl Into<String>, source: Source) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            brand: None,
            price: None,
            image_url: None,
            category_path: None,
            source,
            pair_id: None,
            score: None,
            similarity: None,
            is_active: true,
            is_distractor: None,
        }
    }

    /// Normalize one raw record. Records without an id are unusable.
    pub fn from_value(value: &Value) -> Option<Self> {
        let id = id_field(value, "id").filter(|id| !id.is_empty())?;
        let source = match str_field(value, "source") {
            Some("competitor") => Source::Competitor,
            _ => Source::Client,
        };
        Some(Self {
            id,
            title: str_field(value, "title").unwrap_or_default().to_string(),
            description: str_field(value, "description").map(str::to_string),
            brand: str_field(value, "brand").map(str::to_string),
            price: value.get("price").and_then(Value::as_f64),
            image_url: str_field(value, "image_url").map(str::to_string),
            category_path: str_field(value, "category_path").map(str::to_string),
            source,
            pair_id: int_field(value, "pair_id"),
            score: value.get("score").and_then(Value::as_f64),
            similarity: value.get("similarity").and_then(Value::as_f64),
            is_active: value.get("is_active").and_then(Value::as_bool) != Some(false),
            is_distractor: value.get("is_distractor").and_then(Value::as_bool),
        })
    }

    fn embedding_text(&self) -> String {
        format!("{} {}", self.title, self.description.as_deref().unwrap_or_default())
    }
}

/// One client-competitor link
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchingPair {
    pub pair_id: Option<i64>,
    pub client_id: String,
    pub competitor_id: String,
    pub label: Option<f64>,
    pub is_distractor: Option<bool>,
    pub score: Option<f64>,
    pub similarity: Option<f64>,
}

impl MatchingPair {
    pub fn new(client_id: impl Into<String>, competitor_id: impl Into<String>) -> Self {
        Self {
            pair_id: None,
            client_id: client_id.into(),
            competitor_id: competitor_id.into(),
            label: None,
            is_distractor: None,
            score: None,
            similarity: None,
        }
    }

    /// Normalize one raw record. Both ids are required.
    pub fn from_value(value: &Value) -> Option<Self> {
        Some(Self {
            pair_id: int_field(value, "pair_id"),
            client_id: id_field(value, "client_id")?,
            competitor_id: id_field(value, "competitor_id")?,
            label: value.get("label").and_then(Value::as_f64),
            is_distractor: value.get("is_distractor").and_then(Value::as_bool),
            score: value.get("score").and_then(Value::as_f64),
            similarity: value.get("similarity").and_then(Value::as_f64),
        })
    }
}

fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Random competitors injected into every client bucket
    pub distractors_per_client: usize,
    pub distractor_seed: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            distractors_per_client: 0,
            distractor_seed: 42,
        }
    }
}

/// A client product and its competitor candidates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientBucket {
    pub client: MatchingProduct,
    pub competitors: Vec<MatchingProduct>,
}

/// Post-rescale filtering of a client's competitors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchFilter {
    /// Minimum presented percentage for active, scored competitors
    pub threshold: Option<f64>,
    pub include_inactive: bool,
}

impl Default for MatchFilter {
    fn default() -> Self {
        Self {
            threshold: None,
            include_inactive: true,
        }
    }
}

impl MatchFilter {
    fn keeps(&self, c: &MatchingProduct) -> bool {
        if !c.is_active {
            return self.include_inactive;
        }
        match (self.threshold, c.similarity) {
            (Some(min), Some(pct)) => pct >= min,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientPage {
    pub client_ids: Vec<String>,
    pub clients: Vec<MatchingProduct>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientMatches {
    pub client: MatchingProduct,
    pub competitors: Vec<MatchingProduct>,
}

/// Competitors grouped by client, in first-seen client order
#[derive(Debug, Clone, Default)]
pub struct MatchingIndex {
    by_client: AHashMap<String, ClientBucket>,
    client_ids: Vec<String>,
}

impl MatchingIndex {
    /// Join `pairs` against `products` and score every bucket.
    ///
    /// Pairs whose client or competitor id does not resolve are dropped, so a
    /// client only appears when at least one of its pairs resolves.
    pub fn build(products: &[MatchingProduct], pairs: &[MatchingPair], config: &MatchingConfig) -> Self {
        let embedder = HashEmbedder::default();
        let by_id: AHashMap<&str, &MatchingProduct> =
            products.iter().map(|p| (p.id.as_str(), p)).collect();

        let mut by_client: AHashMap<String, ClientBucket> = AHashMap::new();
        let mut client_ids = Vec::new();
        let mut dropped = 0usize;

        for pair in pairs {
            let (Some(client), Some(competitor)) = (
                by_id.get(pair.client_id.as_str()),
                by_id.get(pair.competitor_id.as_str()),
            ) else {
                debug!(
                    "Dropping pair {:?}: unresolved {} -> {}",
                    pair.pair_id, pair.client_id, pair.competitor_id
                );
                dropped += 1;
                continue;
            };

            let mut enriched = (*competitor).clone();
            enriched.score = pair.score.or(competitor.score);
            enriched.similarity = pair.similarity.or(competitor.similarity);
            enriched.is_distractor = Some(pair.is_distractor.or(competitor.is_distractor).unwrap_or(false));
            enriched.pair_id = pair.pair_id.or(competitor.pair_id);

            by_client
                .entry(pair.client_id.clone())
                .or_insert_with(|| {
                    client_ids.push(pair.client_id.clone());
                    ClientBucket {
                        client: (*client).clone(),
                        competitors: Vec::new(),
                    }
                })
                .competitors
                .push(enriched);
        }

        let pool: Vec<&MatchingProduct> = products
            .iter()
            .filter(|p| p.source == Source::Competitor)
            .collect();
        let mut rng = StdRng::seed_from_u64(config.distractor_seed);

        for id in &client_ids {
            let Some(bucket) = by_client.get_mut(id) else {
                continue;
            };
            let client_vec = embedder.embed(&bucket.client.embedding_text());

            let mut merged = std::mem::take(&mut bucket.competitors);
            for c in &mut merged {
                fill_score(c, &client_vec, &embedder);
            }

            if config.distractors_per_client > 0 && !pool.is_empty() {
                let mut seen: AHashSet<&str> = merged.iter().map(|c| c.id.as_str()).collect();
                seen.insert(bucket.client.id.as_str());
                let mut distractors = Vec::new();
                for _ in 0..pool.len() {
                    if distractors.len() >= config.distractors_per_client {
                        break;
                    }
                    let cand = pool[rng.random_range(0..pool.len())];
                    if !seen.insert(cand.id.as_str()) {
                        continue;
                    }
                    let mut d = cand.clone();
                    d.score = None;
                    d.similarity = None;
                    d.is_active = true;
                    d.is_distractor = Some(true);
                    fill_score(&mut d, &client_vec, &embedder);
                    distractors.push(d);
                }
                merged.extend(distractors);
            }

            bucket.competitors = dedup_by_best_score(merged);
        }

        info!(
            "Matching index built: {} clients from {} pairs ({} dropped)",
            client_ids.len(),
            pairs.len(),
            dropped
        );

        Self { by_client, client_ids }
    }

    pub fn client_ids(&self) -> &[String] {
        &self.client_ids
    }

    pub fn len(&self) -> usize {
        self.client_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.client_ids.is_empty()
    }

    pub fn bucket(&self, client_id: &str) -> Option<&ClientBucket> {
        self.by_client.get(client_id)
    }

    /// A page of clients. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub fn list_clients(&self, offset: usize, limit: usize) -> ClientPage {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let clients = self
            .client_ids
            .iter()
            .skip(offset)
            .take(limit)
            .filter_map(|id| self.by_client.get(id).map(|b| b.client.clone()))
            .collect();
        ClientPage {
            client_ids: self.client_ids.clone(),
            clients,
            total: self.client_ids.len(),
            offset,
            limit,
        }
    }

    /// Best `top_k` competitors of a client with presentation scores.
    ///
    /// Competitors are ranked by raw score (unscored last-ish, as zero), cut
    /// to `top_k` and rescaled into `scale` over this client only, then
    /// filtered.
    pub fn client_matches(
        &self,
        client_id: &str,
        top_k: usize,
        scale: &ScoreScale,
        filter: &MatchFilter,
    ) -> Result<ClientMatches> {
        let bucket = self
            .by_client
            .get(client_id)
            .ok_or_else(|| Error::ClientNotFound(client_id.to_string()))?;

        let mut ranked = bucket.competitors.clone();
        ranked.sort_by(|a, b| {
            b.score
                .unwrap_or(0.0)
                .partial_cmp(&a.score.unwrap_or(0.0))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(top_k.max(1));

        let raw: Vec<Option<f64>> = ranked.iter().map(|c| c.score).collect();
        let presented = scale.rescale(&raw);

        let competitors = ranked
            .into_iter()
            .zip(presented)
            .map(|(mut c, scaled)| {
                c.score = scaled;
                c.similarity = scaled.map(to_percent);
                c
            })
            .filter(|c| filter.keeps(c))
            .collect();

        Ok(ClientMatches {
            client: bucket.client.clone(),
            competitors,
        })
    }
}

/// Complete a competitor's score pair, computing it from text when both
/// halves are missing.
fn fill_score(c: &mut MatchingProduct, client_vec: &Vector, embedder: &HashEmbedder) {
    match (c.score, c.similarity) {
        (Some(_), Some(_)) => {}
        (Some(score), None) => c.similarity = Some(to_percent(score)),
        (None, Some(pct)) => c.score = Some(pct / 100.0),
        (None, None) => {
            let score = client_vec.dot(&embedder.embed(&c.embedding_text()));
            c.score = Some(score);
            c.similarity = Some(to_percent(score));
        }
    }
}

/// Keep one entry per competitor id: the highest-scoring one, in the
/// position where the id first appeared.
pub fn dedup_by_best_score(items: Vec<MatchingProduct>) -> Vec<MatchingProduct> {
    let mut out: Vec<MatchingProduct> = Vec::with_capacity(items.len());
    let mut positions: AHashMap<String, usize> = AHashMap::with_capacity(items.len());
    for c in items {
        match positions.get(&c.id) {
            Some(&i) => {
                if c.score.unwrap_or(-1.0) > out[i].score.unwrap_or(-1.0) {
                    out[i] = c;
                }
            }
            None => {
                positions.insert(c.id.clone(), out.len());
                out.push(c);
            }
        }
    }
    out
}
