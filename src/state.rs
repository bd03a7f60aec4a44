use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::cache::TtlCache;
use crate::config::Config;
use crate::images::lastfm::LastfmProvider;
use crate::images::resolver::ProviderSet;
use crate::images::spotify::{SpotifyProvider, SpotifyTokenSource};
use crate::images::tmdb::{MediaKind, TmdbProvider, TmdbSettings};
use crate::images::token::TokenCache;
use crate::images::wikipedia::WikipediaProvider;
use crate::images::{BatchOrchestrator, ImageProvider};
use crate::llm::{ChatClient, ChatRelatedItems, ChatSettings};
use crate::recommend::RecommendationService;
use crate::utils::http::build_http_client;

/// Process-wide services, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client(Duration::from_secs(config.provider_timeout_seconds))?;

        let spotify_tokens = Arc::new(TokenCache::new(Arc::new(SpotifyTokenSource::new(
            client.clone(),
            &config.spotify_accounts_url,
            &config.spotify_client_id,
            &config.spotify_client_secret,
        ))));
        let lastfm: Arc<dyn ImageProvider> = Arc::new(LastfmProvider::new(
            client.clone(),
            &config.lastfm_api_url,
            &config.lastfm_api_key,
        ));
        let tmdb_settings = Arc::new(TmdbSettings {
            api_key: config.tmdb_api_key.trim().to_string(),
            api_url: config.tmdb_api_url.clone(),
            image_base_url: config.tmdb_image_base_url.clone(),
            image_size: config.tmdb_image_size.clone(),
            language: config.tmdb_language.clone(),
        });
        let tmdb = |kind| -> Arc<dyn ImageProvider> {
            Arc::new(TmdbProvider::new(client.clone(), Arc::clone(&tmdb_settings), kind))
        };

        let spotify = |fallback: Option<Arc<dyn ImageProvider>>| -> Arc<dyn ImageProvider> {
            Arc::new(SpotifyProvider::new(
                client.clone(),
                &config.spotify_api_url,
                Arc::clone(&spotify_tokens),
                fallback,
            ))
        };

        let providers = ProviderSet {
            music_catalog_with_tags: spotify(Some(lastfm)),
            music_catalog: spotify(None),
            tmdb_person: tmdb(MediaKind::Person),
            tmdb_movie: tmdb(MediaKind::Movie),
            tmdb_anime: tmdb(MediaKind::Anime),
            encyclopedia: Arc::new(WikipediaProvider::new(
                client.clone(),
                &config.wikipedia_api_url,
                config.wikipedia_thumb_size,
            )),
        };

        let chat = ChatClient::new(
            client,
            ChatSettings {
                api_key: config.openai_api_key.trim().to_string(),
                base_url: config.openai_base_url.clone(),
                model: config.openai_model.clone(),
                temperature: config.openai_temperature,
                timeout: Duration::from_secs(config.llm_timeout_seconds),
            },
        );
        let related = Arc::new(ChatRelatedItems::new(
            chat,
            TtlCache::new(Duration::from_secs(config.related_items_cache_ttl_seconds)),
            &config.recommendation_language,
            config.max_items_per_category,
        ));

        let orchestrator = BatchOrchestrator::new(
            TtlCache::new(Duration::from_secs(config.image_cache_ttl_seconds)),
            config.image_batch_size,
        );

        Ok(AppState {
            recommendations: Arc::new(RecommendationService::new(
                related,
                orchestrator,
                &providers,
                config.max_items_per_category,
            )),
        })
    }
}
