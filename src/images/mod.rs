pub mod batch;
pub mod lastfm;
pub mod resolver;
pub mod spotify;
pub mod tmdb;
pub mod token;
pub mod validate;
pub mod wikipedia;

use async_trait::async_trait;

pub use batch::BatchOrchestrator;
pub use resolver::{Category, CategoryResolver};

/// Returned for any item whose provider chain produced nothing.
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg?height=400&width=400";

/// One external image source behind a uniform lookup.
///
/// Implementations absorb their own transport and decoding failures: a failed
/// lookup is `None`, never an error, so one provider can never abort a chain.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn resolve(&self, name: &str) -> Option<String>;
}
