use std::sync::Arc;

use tracing::debug;

use crate::images::{ImageProvider, PLACEHOLDER_IMAGE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Artist,
    Celebrity,
    Movie,
    Anime,
    Fashion,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Artist,
        Category::Celebrity,
        Category::Movie,
        Category::Anime,
        Category::Fashion,
    ];

    /// Stable identity, also used in image cache keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Artist => "artist",
            Category::Celebrity => "celebrity",
            Category::Movie => "movie",
            Category::Anime => "anime",
            Category::Fashion => "fashion",
        }
    }

    /// Link target for an item; `{name}` is replaced with the encoded item name.
    pub fn official_url_template(self) -> &'static str {
        match self {
            Category::Artist => "https://open.spotify.com/search/{name}",
            Category::Celebrity | Category::Movie | Category::Anime => {
                "https://www.themoviedb.org/search?query={name}"
            }
            Category::Fashion => "https://www.google.com/search?q={name}",
        }
    }
}

/// The provider instances chains are assembled from.
#[derive(Clone)]
pub struct ProviderSet {
    /// Spotify with Last.fm nested as its fallback. Artist chain only.
    pub music_catalog_with_tags: Arc<dyn ImageProvider>,
    /// Spotify on its own, for chains that must not reach Last.fm.
    pub music_catalog: Arc<dyn ImageProvider>,
    pub tmdb_person: Arc<dyn ImageProvider>,
    pub tmdb_movie: Arc<dyn ImageProvider>,
    pub tmdb_anime: Arc<dyn ImageProvider>,
    pub encyclopedia: Arc<dyn ImageProvider>,
}

/// Ordered provider chain for one category. Always yields an image: the first
/// provider hit, or [`PLACEHOLDER_IMAGE`].
pub struct CategoryResolver {
    category: Category,
    chain: Vec<Arc<dyn ImageProvider>>,
}

impl CategoryResolver {
    pub fn new(category: Category, chain: Vec<Arc<dyn ImageProvider>>) -> Self {
        CategoryResolver { category, chain }
    }

    pub fn for_category(category: Category, providers: &ProviderSet) -> Self {
        let chain = match category {
            Category::Artist => vec![
                Arc::clone(&providers.music_catalog_with_tags),
                Arc::clone(&providers.tmdb_person),
                Arc::clone(&providers.encyclopedia),
            ],
            Category::Celebrity => vec![
                Arc::clone(&providers.tmdb_person),
                Arc::clone(&providers.music_catalog),
                Arc::clone(&providers.encyclopedia),
            ],
            Category::Movie => vec![
                Arc::clone(&providers.tmdb_movie),
                Arc::clone(&providers.encyclopedia),
            ],
            Category::Anime => vec![
                Arc::clone(&providers.tmdb_anime),
                Arc::clone(&providers.encyclopedia),
            ],
            Category::Fashion => vec![Arc::clone(&providers.encyclopedia)],
        };
        CategoryResolver::new(category, chain)
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn identity(&self) -> &'static str {
        self.category.as_str()
    }

    pub fn chain_names(&self) -> Vec<&'static str> {
        self.chain.iter().map(|provider| provider.name()).collect()
    }

    pub async fn resolve(&self, name: &str) -> String {
        if name.trim().is_empty() {
            return PLACEHOLDER_IMAGE.to_string();
        }

        for provider in &self.chain {
            if let Some(url) = provider.resolve(name).await {
                if !url.trim().is_empty() {
                    debug!(
                        "Resolved {} image for '{}' via {}",
                        self.identity(),
                        name,
                        provider.name()
                    );
                    return url;
                }
            }
        }

        debug!(
            "No {} image found for '{}'; using placeholder",
            self.identity(),
            name
        );
        PLACEHOLDER_IMAGE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::testing::FakeProvider;

    fn fake(label: &'static str) -> Arc<dyn ImageProvider> {
        Arc::new(FakeProvider::returning(label, None))
    }

    fn provider_set() -> ProviderSet {
        ProviderSet {
            music_catalog_with_tags: fake("spotify"),
            music_catalog: fake("spotify"),
            tmdb_person: fake("tmdb:person"),
            tmdb_movie: fake("tmdb:movie"),
            tmdb_anime: fake("tmdb:anime"),
            encyclopedia: fake("wikipedia"),
        }
    }

    #[test]
    fn chains_follow_the_category_table() {
        let providers = provider_set();
        let chain = |category| CategoryResolver::for_category(category, &providers).chain_names();

        assert_eq!(
            chain(Category::Artist),
            ["spotify", "tmdb:person", "wikipedia"]
        );
        assert_eq!(
            chain(Category::Celebrity),
            ["tmdb:person", "spotify", "wikipedia"]
        );
        assert_eq!(chain(Category::Movie), ["tmdb:movie", "wikipedia"]);
        assert_eq!(chain(Category::Anime), ["tmdb:anime", "wikipedia"]);
        assert_eq!(chain(Category::Fashion), ["wikipedia"]);
    }

    #[tokio::test]
    async fn only_the_artist_chain_reaches_the_tagged_catalog() {
        let tagged = Arc::new(FakeProvider::returning(
            "spotify",
            Some("https://lastfm.example.com/{name}.png"),
        ));
        let plain = Arc::new(FakeProvider::returning("spotify", None));
        let providers = ProviderSet {
            music_catalog_with_tags: tagged.clone() as Arc<dyn ImageProvider>,
            music_catalog: plain.clone() as Arc<dyn ImageProvider>,
            ..provider_set()
        };

        let celebrity = CategoryResolver::for_category(Category::Celebrity, &providers);
        assert_eq!(celebrity.resolve("Some Actor").await, PLACEHOLDER_IMAGE);
        assert_eq!(plain.calls(), 1);
        assert_eq!(tagged.calls(), 0);

        let artist = CategoryResolver::for_category(Category::Artist, &providers);
        assert_eq!(
            artist.resolve("Some Singer").await,
            "https://lastfm.example.com/Some Singer.png"
        );
        assert_eq!(tagged.calls(), 1);
    }

    #[test]
    fn identities_are_distinct() {
        let mut identities: Vec<_> = Category::ALL.iter().map(|c| c.as_str()).collect();
        identities.sort();
        identities.dedup();
        assert_eq!(identities.len(), Category::ALL.len());
    }

    #[tokio::test]
    async fn first_hit_short_circuits_the_chain() {
        let first = Arc::new(FakeProvider::returning("tmdb:movie", Some("https://img.example.com/a.jpg")));
        let second = Arc::new(FakeProvider::returning("wikipedia", Some("https://wiki.example.com/b.jpg")));
        let resolver = CategoryResolver::new(
            Category::Movie,
            vec![
                first.clone() as Arc<dyn ImageProvider>,
                second.clone() as Arc<dyn ImageProvider>,
            ],
        );

        assert_eq!(resolver.resolve("Example Film").await, "https://img.example.com/a.jpg");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn falls_through_to_the_next_provider_on_miss() {
        let first = Arc::new(FakeProvider::returning("tmdb:movie", None));
        let second = Arc::new(FakeProvider::returning("wikipedia", Some("https://wiki.example.com/b.jpg")));
        let resolver = CategoryResolver::new(
            Category::Movie,
            vec![
                first.clone() as Arc<dyn ImageProvider>,
                second.clone() as Arc<dyn ImageProvider>,
            ],
        );

        assert_eq!(resolver.resolve("Example Film").await, "https://wiki.example.com/b.jpg");
        assert_eq!(first.calls(), 1);
        assert_eq!(second.calls(), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_returns_the_placeholder() {
        let providers: Vec<Arc<FakeProvider>> = vec![
            Arc::new(FakeProvider::returning("tmdb:person", None)),
            Arc::new(FakeProvider::returning("spotify", Some("  "))),
            Arc::new(FakeProvider::returning("wikipedia", None)),
        ];
        let chain = providers
            .iter()
            .map(|provider| Arc::clone(provider) as Arc<dyn ImageProvider>)
            .collect();
        let resolver = CategoryResolver::new(Category::Celebrity, chain);

        assert_eq!(resolver.resolve("Nobody").await, PLACEHOLDER_IMAGE);
        assert!(providers.iter().all(|provider| provider.calls() == 1));
    }

    #[tokio::test]
    async fn blank_names_never_reach_providers() {
        let provider = Arc::new(FakeProvider::returning("wikipedia", Some("https://wiki.example.com/b.jpg")));
        let resolver = CategoryResolver::new(
            Category::Fashion,
            vec![provider.clone() as Arc<dyn ImageProvider>],
        );

        assert_eq!(resolver.resolve("   ").await, PLACEHOLDER_IMAGE);
        assert_eq!(provider.calls(), 0);
    }
}
