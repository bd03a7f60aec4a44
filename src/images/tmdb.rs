use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::images::validate::is_valid_image_url;
use crate::images::ImageProvider;

/// TMDB genre id for animation, used to carve anime out of TV/movie search.
pub const ANIMATION_GENRE_ID: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Person,
    Movie,
    Anime,
}

impl MediaKind {
    /// Search endpoints tried in order for this kind.
    fn search_paths(self) -> &'static [&'static str] {
        match self {
            MediaKind::Person => &["person"],
            MediaKind::Movie => &["movie"],
            MediaKind::Anime => &["tv", "movie"],
        }
    }

    fn provider_name(self) -> &'static str {
        match self {
            MediaKind::Person => "tmdb:person",
            MediaKind::Movie => "tmdb:movie",
            MediaKind::Anime => "tmdb:anime",
        }
    }
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbResult {
    profile_path: Option<String>,
    poster_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u32>,
}

#[derive(Debug, Clone)]
pub struct TmdbSettings {
    pub api_key: String,
    pub api_url: String,
    pub image_base_url: String,
    pub image_size: String,
    pub language: String,
}

fn extract_image_path(kind: MediaKind, payload: TmdbSearchResponse) -> Option<String> {
    let result = match kind {
        MediaKind::Anime => payload
            .results
            .into_iter()
            .find(|result| result.genre_ids.contains(&ANIMATION_GENRE_ID))?,
        MediaKind::Person | MediaKind::Movie => payload.results.into_iter().next()?,
    };
    let path = match kind {
        MediaKind::Person => result.profile_path,
        MediaKind::Movie | MediaKind::Anime => result.poster_path,
    }?;
    let path = path.trim();
    if path.is_empty() {
        None
    } else {
        Some(path.to_string())
    }
}

pub fn build_image_url(image_base_url: &str, image_size: &str, path: &str) -> String {
    format!(
        "{}/{}/{}",
        image_base_url.trim_end_matches('/'),
        image_size.trim_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Person portraits and posters from The Movie Database.
pub struct TmdbProvider {
    client: Client,
    settings: Arc<TmdbSettings>,
    kind: MediaKind,
}

impl TmdbProvider {
    pub fn new(client: Client, settings: Arc<TmdbSettings>, kind: MediaKind) -> Self {
        TmdbProvider {
            client,
            settings,
            kind,
        }
    }

    async fn search(&self, path: &str, name: &str) -> Result<TmdbSearchResponse> {
        let response = self
            .client
            .get(format!("{}/search/{}", self.settings.api_url, path))
            .query(&[
                ("api_key", self.settings.api_key.as_str()),
                ("query", name),
                ("language", self.settings.language.as_str()),
            ])
            .send()
            .await
            .map_err(|err| anyhow!("TMDB request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(anyhow!("TMDB API error: {}", response.status()));
        }

        response
            .json::<TmdbSearchResponse>()
            .await
            .map_err(|err| anyhow!("Invalid TMDB response: {err}"))
    }

    /// Tries each search endpoint for this kind; a failed endpoint does not
    /// stop the next one.
    async fn find_image(&self, name: &str) -> Option<String> {
        for path in self.kind.search_paths() {
            let payload = match self.search(path, name).await {
                Ok(payload) => payload,
                Err(err) => {
                    warn!("Error searching TMDB {path} for '{name}': {err}");
                    continue;
                }
            };
            if let Some(image_path) = extract_image_path(self.kind, payload) {
                let url = build_image_url(
                    &self.settings.image_base_url,
                    &self.settings.image_size,
                    &image_path,
                );
                if is_valid_image_url(&url) {
                    return Some(url);
                }
            }
        }
        None
    }
}

#[async_trait]
impl ImageProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        self.kind.provider_name()
    }

    async fn resolve(&self, name: &str) -> Option<String> {
        if self.settings.api_key.trim().is_empty() {
            debug!("TMDB API key is not configured");
            return None;
        }

        self.find_image(name).await
    }
}
