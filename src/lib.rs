//! # prodsim
//!
//! Multimodal product similarity service: semantic search, item-to-item
//! recommendations, client to competitor "smart connections" and a human
//! evaluation workflow for checking embedding quality.
//!
//! Text is embedded with a deterministic hashing scheme (no model, no
//! network), ranked by cosine similarity and rescaled into a bounded display
//! range per result set.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! prodsim --data-dir ./data --http-port 3000
//! curl 'http://localhost:3000/api/search?q=red%20shoe&topK=5'
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use prodsim::prelude::*;
//!
//! let catalog = Catalog::new(vec![
//!     Product::new("a", "red shoe", ""),
//!     Product::new("b", "red running shoe", ""),
//!     Product::new("c", "blue hat", ""),
//! ]);
//!
//! let similar = catalog.find_similar("a", SimilarityMode::Text, 2, None).unwrap();
//! assert_eq!(similar.results[0].product.id, "b");
//!
//! let set = catalog.build_eval_set(7, &EvalSetConfig::default()).unwrap();
//! assert_eq!(set.base.id, "b");
//! ```
//!
//! ## Crate Structure
//!
//! - `prodsim-core` - embedding, retrieval, presentation, sampling and matching
//! - `prodsim-storage` - dump parsing, caches, feedback log, `DataManager`
//! - `prodsim-api` - REST API

pub mod logging;

// Re-export core types
pub use prodsim_core::{
    Catalog, ClientMatches, ClientPage, Error, EvalSet, EvalSetConfig, HashEmbedder, MatchFilter,
    MatchingConfig, MatchingIndex, MatchingPair, MatchingProduct, Product, RankedProduct, Result,
    ScoreScale, SearchResults, Signals, SimilarResults, SimilarityMode, Vector,
};

// Re-export storage
pub use prodsim_storage::{DataConfig, DataManager, FeedbackLog, FeedbackRecord};

// Re-export API
pub use prodsim_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Catalog, DataConfig, DataManager, Error, EvalSetConfig, MatchFilter, Product, RestApi,
        Result, ScoreScale, SimilarityMode, Vector,
    };
}

/// Embedding primitives
pub mod embedding {
    pub use prodsim_core::embedder::{embed, hash_token, tokenize, VECTOR_SIZE};
    pub use prodsim_core::retriever::top_k;
}
