use futures::future::join_all;
use tracing::debug;

use crate::cache::TtlCache;
use crate::images::CategoryResolver;
use crate::models::{Item, ResolvedItem};

pub const DEFAULT_BATCH_SIZE: usize = 5;

pub fn image_cache_key(name: &str, resolver_identity: &str) -> String {
    format!("{name}-{resolver_identity}")
}

/// Fills `{name}` in `template` with the percent-encoded item name, or appends
/// the encoded name when the template has no placeholder.
pub fn official_url(template: &str, name: &str) -> String {
    let encoded = urlencoding::encode(name);
    if template.contains("{name}") {
        template.replace("{name}", &encoded)
    } else {
        format!("{template}{encoded}")
    }
}

/// Resolves images for a category's items in fixed-size chunks.
///
/// Chunks run one after another; items inside a chunk resolve concurrently.
/// Output order always matches input order.
#[derive(Clone)]
pub struct BatchOrchestrator {
    cache: TtlCache<String>,
    batch_size: usize,
}

impl BatchOrchestrator {
    pub fn new(cache: TtlCache<String>, batch_size: usize) -> Self {
        BatchOrchestrator {
            cache,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn process_category(
        &self,
        items: &[Item],
        resolver: &CategoryResolver,
        official_url_template: &str,
    ) -> Vec<ResolvedItem> {
        let mut processed = Vec::with_capacity(items.len());
        for (index, chunk) in items.chunks(self.batch_size).enumerate() {
            debug!(
                "Resolving {} chunk {} ({} item(s))",
                resolver.identity(),
                index + 1,
                chunk.len()
            );
            let resolved = join_all(chunk.iter().map(|item| async move {
                let image_url = self.image_for(&item.name, resolver).await;
                ResolvedItem::from_item(
                    item,
                    image_url,
                    official_url(official_url_template, &item.name),
                )
            }))
            .await;
            processed.extend(resolved);
        }
        processed
    }

    pub fn cached_images(&self) -> usize {
        self.cache.len()
    }

    async fn image_for(&self, name: &str, resolver: &CategoryResolver) -> String {
        let key = image_cache_key(name, resolver.identity());
        if let Some(url) = self.cache.get(&key) {
            return url;
        }

        let url = resolver.resolve(name).await;
        self.cache.set(key, url.clone());
        url
    }
}
