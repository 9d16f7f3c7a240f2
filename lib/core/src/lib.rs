//! # prodsim Core
//!
//! Similarity engine behind the prodsim demo service.
//!
//! - [`embedder`] - hashed bag-of-words text embeddings
//! - [`Vector`] - dense vectors, normalization and dot product
//! - [`retriever::top_k`] - brute-force top-K retrieval
//! - [`ScoreScale`] - min-max presentation rescaling
//! - [`sampler`] - seeded sampling for evaluation sets
//! - [`Catalog`] - products with their embeddings and the query operations
//! - [`MatchingIndex`] - client to competitor matching
//!
//! ## Example
//!
//! ```rust
//! use prodsim_core::{Catalog, Product, SimilarityMode};
//!
//! let catalog = Catalog::new(vec![
//!     Product::new("a", "red shoe", ""),
//!     Product::new("b", "blue hat", ""),
//! ]);
//!
//! let results = catalog.search("red shoe", 10, SimilarityMode::Text, None);
//! assert_eq!(results.results[0].product.id, "a");
//! ```

pub mod catalog;
pub mod embedder;
pub mod error;
pub mod matching;
pub mod presenter;
pub mod product;
pub mod retriever;
pub mod sampler;
pub mod vector;

pub use catalog::{
    Catalog, EvalCandidate, EvalSet, RankedProduct, SearchResults, SimilarResults, SimilarityMode,
    Signals,
};
pub use embedder::{embed, HashEmbedder, VECTOR_SIZE};
pub use error::{Error, Result};
pub use matching::{
    ClientBucket, ClientMatches, ClientPage, MatchFilter, MatchingConfig, MatchingIndex,
    MatchingPair, MatchingProduct, Source,
};
pub use presenter::ScoreScale;
pub use product::Product;
pub use retriever::{top_k, ScoredIndex};
pub use sampler::{seeded_random, EvalSetConfig};
pub use vector::{combine_and_normalize, Vector};
