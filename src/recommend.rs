use std::sync::Arc;

use futures::future::join_all;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::images::batch::official_url;
use crate::images::resolver::ProviderSet;
use crate::images::{BatchOrchestrator, Category, CategoryResolver, PLACEHOLDER_IMAGE};
use crate::llm::RelatedItemsSource;
use crate::models::{Item, Recommendations, ResolvedItem};
use crate::utils::timing::QueryTimer;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("related items could not be fetched for any category; check the language model API key and endpoint ({0})")]
    UpstreamUnavailable(String),
}

/// Stand-in items used when the language model fails for a category.
pub fn placeholder_items(count: usize) -> Vec<Item> {
    (0..count)
        .map(|_| Item {
            name: "Recommended item".to_string(),
            reason: "A related recommendation.".to_string(),
            features: vec![
                "Feature 1".to_string(),
                "Feature 2".to_string(),
                "Feature 3".to_string(),
            ],
        })
        .collect()
}

fn placeholder_results(count: usize, template: &str) -> Vec<ResolvedItem> {
    placeholder_items(count)
        .iter()
        .map(|item| {
            ResolvedItem::from_item(
                item,
                PLACEHOLDER_IMAGE.to_string(),
                official_url(template, &item.name),
            )
        })
        .collect()
}

pub struct RecommendationService {
    related: Arc<dyn RelatedItemsSource>,
    orchestrator: BatchOrchestrator,
    resolvers: Vec<CategoryResolver>,
    max_items: usize,
}

impl RecommendationService {
    pub fn new(
        related: Arc<dyn RelatedItemsSource>,
        orchestrator: BatchOrchestrator,
        providers: &ProviderSet,
        max_items: usize,
    ) -> Self {
        let resolvers: Vec<CategoryResolver> = Category::ALL
            .iter()
            .map(|category| CategoryResolver::for_category(*category, providers))
            .collect();
        for resolver in &resolvers {
            debug!(
                "Image chain for {}: {}",
                resolver.identity(),
                resolver.chain_names().join(" -> ")
            );
        }
        RecommendationService {
            related,
            orchestrator,
            resolvers,
            max_items: max_items.max(1),
        }
    }

    async fn related_for(&self, query: &str, category: Category) -> anyhow::Result<Vec<Item>> {
        let mut items = self.related.related_items(query, category).await?;
        items.truncate(self.max_items);
        Ok(items)
    }

    /// Related items for every category with images resolved.
    ///
    /// A category whose related-items request fails is filled with placeholder
    /// items. Only when every category fails is an error returned.
    pub async fn get_recommendations(
        &self,
        query: &str,
    ) -> Result<Recommendations, RecommendError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RecommendError::EmptyQuery);
        }
        let mut timer = QueryTimer::start(query);

        let fetched = join_all(
            self.resolvers
                .iter()
                .map(|resolver| self.related_for(query, resolver.category())),
        )
        .await;

        if fetched.iter().all(|result| result.is_err()) {
            let detail = fetched
                .iter()
                .filter_map(|result| result.as_ref().err())
                .map(|err| err.to_string())
                .last()
                .unwrap_or_default();
            warn!("Every related items request failed for '{query}': {detail}");
            timer.complete("error", Some(detail.clone()));
            return Err(RecommendError::UpstreamUnavailable(detail));
        }

        let processed = join_all(self.resolvers.iter().zip(fetched).map(
            |(resolver, fetched)| async move {
                let template = resolver.category().official_url_template();
                let resolved = match fetched {
                    Ok(items) => {
                        self.orchestrator
                            .process_category(&items, resolver, template)
                            .await
                    }
                    Err(err) => {
                        warn!(
                            "Related items for {} failed; using placeholders: {err}",
                            resolver.identity()
                        );
                        placeholder_results(self.max_items, template)
                    }
                };
                (resolver.category(), resolved)
            },
        ))
        .await;

        let mut recommendations = Recommendations::default();
        for (category, items) in processed {
            match category {
                Category::Artist => recommendations.artists = items,
                Category::Celebrity => recommendations.celebrities = items,
                Category::Movie => recommendations.movies = items,
                Category::Anime => recommendations.anime = items,
                Category::Fashion => recommendations.fashion = items,
            }
        }

        info!(
            "Recommendations for '{}': artists={} celebrities={} movies={} anime={} fashion={} cached_images={}",
            query,
            recommendations.artists.len(),
            recommendations.celebrities.len(),
            recommendations.movies.len(),
            recommendations.anime.len(),
            recommendations.fashion.len(),
            self.orchestrator.cached_images()
        );
        timer.complete("success", None);
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use anyhow::anyhow;
    use async_trait::async_trait;

    use super::*;
    use crate::cache::TtlCache;
    use crate::images::testing::FakeProvider;
    use crate::images::ImageProvider;

    struct FakeRelated {
        failing: HashSet<Category>,
        count: usize,
    }

    #[async_trait]
    impl RelatedItemsSource for FakeRelated {
        async fn related_items(&self, query: &str, category: Category) -> anyhow::Result<Vec<Item>> {
            if self.failing.contains(&category) {
                return Err(anyhow!("status 500"));
            }
            Ok((0..self.count)
                .map(|i| Item {
                    name: format!("{query} {} {i}", category.as_str()),
                    reason: "related".to_string(),
                    features: Vec::new(),
                })
                .collect())
        }
    }

    struct Fixture {
        service: RecommendationService,
        encyclopedia: Arc<FakeProvider>,
    }

    fn fixture(failing: &[Category], count: usize) -> Fixture {
        let encyclopedia = Arc::new(FakeProvider::returning(
            "wikipedia",
            Some("https://upload.wikimedia.org/{name}.jpg"),
        ));
        let miss = |label| Arc::new(FakeProvider::returning(label, None)) as Arc<dyn ImageProvider>;
        let providers = ProviderSet {
            music_catalog_with_tags: miss("spotify"),
            music_catalog: miss("spotify"),
            tmdb_person: miss("tmdb:person"),
            tmdb_movie: miss("tmdb:movie"),
            tmdb_anime: miss("tmdb:anime"),
            encyclopedia: encyclopedia.clone() as Arc<dyn ImageProvider>,
        };
        let related = Arc::new(FakeRelated {
            failing: failing.iter().copied().collect(),
            count,
        });
        let orchestrator = BatchOrchestrator::new(TtlCache::new(Duration::from_secs(3600)), 5);
        Fixture {
            service: RecommendationService::new(related, orchestrator, &providers, 10),
            encyclopedia,
        }
    }

    #[tokio::test]
    async fn fills_every_category_capped_at_ten() {
        let fixture = fixture(&[], 12);
        let result = fixture.service.get_recommendations(" YOASOBI ").await.unwrap();

        for items in [
            &result.artists,
            &result.celebrities,
            &result.movies,
            &result.anime,
            &result.fashion,
        ] {
            assert_eq!(items.len(), 10);
            assert!(items.iter().all(|item| !item.image_url.is_empty()));
        }
        assert_eq!(result.movies[0].name, "YOASOBI movie 0");
        assert_eq!(
            result.movies[0].image_url,
            "https://upload.wikimedia.org/YOASOBI movie 0.jpg"
        );
        assert_eq!(
            result.fashion[3].official_url,
            "https://www.google.com/search?q=YOASOBI%20fashion%203"
        );
        assert_eq!(fixture.encyclopedia.calls(), 50);
    }

    #[tokio::test]
    async fn failed_category_gets_placeholder_items() {
        let fixture = fixture(&[Category::Anime], 3);
        let result = fixture.service.get_recommendations("YOASOBI").await.unwrap();

        assert_eq!(result.anime.len(), 10);
        assert!(result
            .anime
            .iter()
            .all(|item| item.image_url == PLACEHOLDER_IMAGE && item.name == "Recommended item"));
        assert_eq!(result.artists.len(), 3);
        assert_eq!(fixture.encyclopedia.calls(), 12);
    }

    #[tokio::test]
    async fn total_upstream_failure_is_an_error() {
        let fixture = fixture(&Category::ALL, 3);
        let err = fixture
            .service
            .get_recommendations("YOASOBI")
            .await
            .unwrap_err();
        assert!(matches!(err, RecommendError::UpstreamUnavailable(_)));
        assert_eq!(fixture.encyclopedia.calls(), 0);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let fixture = fixture(&[], 3);
        assert!(matches!(
            fixture.service.get_recommendations("   ").await,
            Err(RecommendError::EmptyQuery)
        ));
    }
}
