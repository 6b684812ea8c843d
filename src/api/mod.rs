pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::{ApiClient, IdeaStore};
pub use error::ApiError;
pub use memory::InMemoryStore;
pub use types::IdeasOut;
