pub mod codec;
pub mod config;
pub mod error;
pub mod http_server;
pub mod http_types;
pub mod index_manager;
pub mod mmap_region;
pub mod observability;
pub mod ordered_index;
pub mod search;
pub mod statistics;
pub mod store;
pub mod trigram_index;
pub mod types;
pub mod vector_index;

pub use error::{Result, StoreError};
pub use search::{SearchQuery, SearchResult};
pub use store::Store;
pub use types::{Entry, IndexType, Scalar, Value};
