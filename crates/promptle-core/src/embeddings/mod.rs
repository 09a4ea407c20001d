pub mod cache;
pub mod util;

pub use cache::EmbeddingCache;
