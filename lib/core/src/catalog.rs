//! Product catalog with its precomputed embeddings
//!
//! `products[i]`, `emb_text[i]` and `emb_img[i]` always describe the same
//! product. There is no image model yet: the image channel is a copy of the
//! text channel, so image and mixed similarity currently rank exactly like
//! text similarity. Supplying real image vectors is the only change needed
//! to make the mixed mode meaningful.

use crate::embedder::HashEmbedder;
use crate::product::Product;
use crate::retriever::{top_k, ScoredIndex};
use crate::sampler::{fill_random, shuffle_order, EvalSetConfig};
use crate::vector::{combine_and_normalize, Vector};
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Which embedding channel drives a similarity query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMode {
    Text,
    Image,
    Mixed,
}

impl SimilarityMode {
    /// Parse a mode name, falling back to `default` for anything unknown.
    pub fn parse_or(value: Option<&str>, default: SimilarityMode) -> SimilarityMode {
        match value.map(str::to_lowercase).as_deref() {
            Some("text" | "texto") => SimilarityMode::Text,
            Some("image" | "imagen") => SimilarityMode::Image,
            Some("mixed" | "mixto" | "todo") => SimilarityMode::Mixed,
            _ => default,
        }
    }
}

/// Optional per-request feature toggles.
///
/// Only `image: false` is acted on; it switches the image channel off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signals(Map<String, Value>);

impl Signals {
    /// Parse a JSON object of toggles. Anything else counts as no signals.
    pub fn parse(raw: &str) -> Option<Signals> {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Some(Signals(map)),
            _ => None,
        }
    }

    pub fn allows_image(&self) -> bool {
        self.0.get("image") != Some(&Value::Bool(false))
    }
}

/// A product returned by a ranked query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedProduct {
    #[serde(flatten)]
    pub product: Product,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub results: Vec<RankedProduct>,
    pub total: usize,
    pub mode: SimilarityMode,
    pub signals: Option<Signals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarResults {
    pub origin: Product,
    pub results: Vec<RankedProduct>,
    pub mode: SimilarityMode,
    pub signals: Option<Signals>,
}

/// One entry of an evaluation set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalCandidate {
    #[serde(flatten)]
    pub product: Product,
    /// `<product id>-<position before shuffling>`, unique within the set
    pub candidate_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalSet {
    pub base: Product,
    pub candidates: Vec<EvalCandidate>,
    pub seed: i64,
}

/// Immutable catalog plus embeddings, indexed by position
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    emb_text: Vec<Vector>,
    emb_img: Vec<Option<Vector>>,
    by_id: AHashMap<String, usize>,
    embedder: HashEmbedder,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self::with_embedder(products, HashEmbedder::default())
    }

    pub fn with_embedder(products: Vec<Product>, embedder: HashEmbedder) -> Self {
        let emb_text: Vec<Vector> = products
            .par_iter()
            .map(|p| embedder.embed(&p.embedding_text()))
            .collect();
        let emb_img = emb_text.iter().cloned().map(Some).collect();

        let mut by_id = AHashMap::with_capacity(products.len());
        for (idx, p) in products.iter().enumerate() {
            by_id.entry(p.id.clone()).or_insert(idx);
        }

        debug!("Embedded {} products", products.len());

        Self {
            products,
            emb_text,
            emb_img,
            by_id,
            embedder,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn text_embeddings(&self) -> &[Vector] {
        &self.emb_text
    }

    pub fn image_embeddings(&self) -> &[Option<Vector>] {
        &self.emb_img
    }

    /// Position of the first product with `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.position(id).map(|idx| &self.products[idx])
    }

    /// Embed free text with the catalog's embedder
    pub fn embed_query(&self, text: &str) -> Vector {
        self.embedder.embed(text)
    }

    /// Rank the catalog against a free-text query.
    ///
    /// Queries are text only, so every mode ranks by text embeddings; the
    /// requested mode is echoed back.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        mode: SimilarityMode,
        signals: Option<Signals>,
    ) -> SearchResults {
        let query_vec = self.embed_query(query);
        let scored = top_k(&query_vec, self.emb_text.iter().map(Some), limit, None);
        SearchResults {
            results: self.ranked(&scored, false),
            total: self.len(),
            mode,
            signals,
        }
    }

    /// Rank the catalog against one of its own products, excluding it.
    pub fn find_similar(
        &self,
        product_id: &str,
        mode: SimilarityMode,
        limit: usize,
        signals: Option<Signals>,
    ) -> Result<SimilarResults> {
        let idx = self
            .position(product_id)
            .ok_or_else(|| Error::ProductNotFound(product_id.to_string()))?;
        let allow_image = signals.as_ref().map_or(true, Signals::allows_image);

        let query = self.channel_vector(idx, mode, allow_image);
        let candidates: Vec<Option<Vector>> = (0..self.len())
            .map(|i| Some(self.channel_vector(i, mode, allow_image)))
            .collect();
        let scored = top_k(&query, candidates.iter().map(Option::as_ref), limit, Some(idx));

        Ok(SimilarResults {
            origin: self.products[idx].clone(),
            results: self.ranked(&scored, true),
            mode,
            signals,
        })
    }

    /// Build the evaluation set for `seed`: the base item, its nearest
    /// neighbours and seeded random fillers, in a seeded shuffled order.
    pub fn build_eval_set(&self, seed: i64, config: &EvalSetConfig) -> Result<EvalSet> {
        if self.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        let n = self.len();
        let base_idx = seed.rem_euclid(n as i64) as usize;

        let similar = top_k(
            &self.emb_text[base_idx],
            self.emb_text.iter().map(Some),
            config.top_candidates + config.margin,
            Some(base_idx),
        );
        let top: Vec<usize> = similar
            .iter()
            .filter(|s| s.score.is_finite())
            .take(config.top_candidates)
            .map(|s| s.index)
            .collect();

        let mut used: AHashSet<usize> = top.iter().copied().collect();
        used.insert(base_idx);
        let randoms = fill_random(seed, n, config.random_candidates, config.max_attempts, &mut used);
        if randoms.len() < config.random_candidates {
            debug!(
                "Eval set for seed {} short of random fillers: {}/{}",
                seed,
                randoms.len(),
                config.random_candidates
            );
        }

        let combined: Vec<usize> = top.into_iter().chain(randoms).collect();
        let candidates = shuffle_order(seed, combined.len())
            .into_iter()
            .map(|pos| {
                let product = self.products[combined[pos]].clone();
                EvalCandidate {
                    candidate_id: format!("{}-{}", product.id, pos),
                    product,
                }
            })
            .collect();

        Ok(EvalSet {
            base: self.products[base_idx].clone(),
            candidates,
            seed,
        })
    }

    fn channel_vector(&self, idx: usize, mode: SimilarityMode, allow_image: bool) -> Vector {
        let text = &self.emb_text[idx];
        let image = self.emb_img[idx].as_ref();
        match (mode, allow_image) {
            (SimilarityMode::Image, true) => image.unwrap_or(text).clone(),
            (SimilarityMode::Mixed, true) => {
                combine_and_normalize(Some(text), image).unwrap_or_else(|| text.clone())
            }
            _ => text.clone(),
        }
    }

    fn ranked(&self, scored: &[ScoredIndex], with_similarity: bool) -> Vec<RankedProduct> {
        scored
            .iter()
            .map(|s| RankedProduct {
                product: self.products[s.index].clone(),
                score: s.score,
                similarity: with_similarity.then(|| crate::presenter::display_percent(s.score)),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(items: &[(&str, &str)]) -> Catalog {
        Catalog::new(items.iter().map(|(id, title)| Product::new(*id, *title, "")).collect())
    }

    fn ten_items() -> Catalog {
        catalog(&[
            ("p0", "red shoe"),
            ("p1", "red running shoe"),
            ("p2", "blue hat"),
            ("p3", "wool hat"),
            ("p4", "phone case"),
            ("p5", "leather phone case"),
            ("p6", "usb cable"),
            ("p7", "charger cable"),
            ("p8", "green shoe"),
            ("p9", "screen protector"),
        ])
    }

    #[test]
    fn test_parallel_arrays() {
        let c = ten_items();
        assert_eq!(c.products().len(), c.text_embeddings().len());
        assert_eq!(c.products().len(), c.image_embeddings().len());
        for (text, img) in c.text_embeddings().iter().zip(c.image_embeddings()) {
            assert_eq!(Some(text), img.as_ref());
        }
    }

    #[test]
    fn test_search_ranks_identical_text_first() {
        let c = catalog(&[("a", "red shoe"), ("b", "red shoe"), ("c", "blue hat")]);
        let res = c.search("red shoe", 3, SimilarityMode::Text, None);
        assert_eq!(res.total, 3);
        let ids: Vec<&str> = res.results.iter().map(|r| r.product.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!((res.results[0].score - 1.0).abs() < 1e-9);
        assert!((res.results[1].score - 1.0).abs() < 1e-9);
        assert!(res.results[2].score < res.results[1].score);
    }

    #[test]
    fn test_find_similar_excludes_origin() {
        let c = ten_items();
        for mode in [SimilarityMode::Text, SimilarityMode::Image, SimilarityMode::Mixed] {
            let res = c.find_similar("p0", mode, 4, None).unwrap();
            assert_eq!(res.origin.id, "p0");
            assert!(res.results.len() <= 4);
            assert!(res.results.iter().all(|r| r.product.id != "p0"));
            assert_eq!(res.results[0].product.id, "p1");
            assert!(res.results.iter().all(|r| r.similarity.is_some()));
        }
    }

    #[test]
    fn test_modes_agree_while_image_is_placeholder() {
        let c = ten_items();
        let text = c.find_similar("p4", SimilarityMode::Text, 9, None).unwrap();
        let mixed = c.find_similar("p4", SimilarityMode::Mixed, 9, None).unwrap();
        let no_image = Signals::parse(r#"{"image": false}"#);
        let image_off = c.find_similar("p4", SimilarityMode::Image, 9, no_image).unwrap();
        for other in [&mixed, &image_off] {
            let a: Vec<&str> = text.results.iter().map(|r| r.product.id.as_str()).collect();
            let b: Vec<&str> = other.results.iter().map(|r| r.product.id.as_str()).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_find_similar_unknown_product() {
        let c = ten_items();
        assert!(matches!(
            c.find_similar("nope", SimilarityMode::Text, 5, None),
            Err(Error::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(SimilarityMode::parse_or(Some("imagen"), SimilarityMode::Text), SimilarityMode::Image);
        assert_eq!(SimilarityMode::parse_or(Some("TODO"), SimilarityMode::Text), SimilarityMode::Mixed);
        assert_eq!(SimilarityMode::parse_or(Some("texto"), SimilarityMode::Mixed), SimilarityMode::Text);
        assert_eq!(SimilarityMode::parse_or(Some("??"), SimilarityMode::Mixed), SimilarityMode::Mixed);
        assert_eq!(SimilarityMode::parse_or(None, SimilarityMode::Text), SimilarityMode::Text);
    }

    #[test]
    fn test_signals() {
        assert!(Signals::parse("not json").is_none());
        assert!(Signals::parse("[true]").is_none());
        assert!(Signals::parse(r#"{"title": true}"#).unwrap().allows_image());
        assert!(!Signals::parse(r#"{"image": false}"#).unwrap().allows_image());
    }

    #[test]
    fn test_eval_set_is_deterministic() {
        let c = ten_items();
        let config = EvalSetConfig::default();
        let first = c.build_eval_set(1, &config).unwrap();
        let second = c.build_eval_set(1, &config).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.base.id, "p1");
        assert_eq!(first.seed, 1);
    }

    #[test]
    fn test_eval_set_has_no_repeats() {
        let c = ten_items();
        let config = EvalSetConfig::default();
        for seed in 1..30 {
            let set = c.build_eval_set(seed, &config).unwrap();
            let ids: AHashSet<&str> = set.candidates.iter().map(|c| c.product.id.as_str()).collect();
            assert_eq!(ids.len(), set.candidates.len());
            assert!(!ids.contains(set.base.id.as_str()));
            assert!(set.candidates.len() <= 10);
            let cids: AHashSet<&str> = set.candidates.iter().map(|c| c.candidate_id.as_str()).collect();
            assert_eq!(cids.len(), set.candidates.len());
        }
    }

    #[test]
    fn test_eval_set_negative_seed_and_tiny_catalog() {
        let c = ten_items();
        let set = c.build_eval_set(-3, &EvalSetConfig::default()).unwrap();
        assert_eq!(set.base.id, "p7");

        let single = catalog(&[("only", "lonely item")]);
        let set = single.build_eval_set(4, &EvalSetConfig::default()).unwrap();
        assert_eq!(set.base.id, "only");
        assert!(set.candidates.is_empty());
    }

    #[test]
    fn test_eval_set_empty_catalog() {
        let c = Catalog::new(Vec::new());
        assert!(matches!(c.build_eval_set(1, &EvalSetConfig::default()), Err(Error::EmptyCatalog)));
    }
}
