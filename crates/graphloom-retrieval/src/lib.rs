//! Retrieval engine: four independently callable query shapes over the
//! graph store plus the embedding index.
//!
//! - [`subgraph::fetch_subgraph`] — bounded BFS expansion with
//!   truncation-aware stats
//! - [`topn::fetch_top_n`] — salience/category/recency document ranking
//! - [`path::fetch_shortest_path`] — hop-count shortest path between
//!   entities
//! - [`hybrid::search_hybrid`] — cosine similarity blended with
//!   precomputed structure scores

pub mod hybrid;
pub mod index;
pub mod path;
pub mod subgraph;
pub mod topn;

pub use hybrid::{resolve_alpha, search_hybrid, HybridParams, HybridResult};
pub use index::{
    cosine_similarity, normalize_vector, url_to_doc_id, EmbeddingIndex, IndexCache, IndexEntry,
    VectorIndexConfig,
};
pub use path::{fetch_shortest_path, PathParams, PathResult};
pub use subgraph::{fetch_subgraph, Subgraph, SubgraphParams};
pub use topn::{fetch_top_n, TopNParams, TopNResult};
