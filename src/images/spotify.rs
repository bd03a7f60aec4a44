use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::images::token::{
    ProviderToken, TokenCache, TokenError, TokenSource, DEFAULT_EXPIRES_IN_SECONDS,
};
use crate::images::validate::is_valid_image_url;
use crate::images::ImageProvider;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: Option<ArtistPage>,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<SpotifyArtist>,
}

#[derive(Debug, Deserialize)]
struct SpotifyArtist {
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Debug, Deserialize)]
struct SpotifyImage {
    url: Option<String>,
    width: Option<u32>,
}

/// Client-credentials grant against the Spotify accounts service.
pub struct SpotifyTokenSource {
    client: Client,
    accounts_url: String,
    client_id: String,
    client_secret: String,
}

impl SpotifyTokenSource {
    pub fn new(client: Client, accounts_url: &str, client_id: &str, client_secret: &str) -> Self {
        SpotifyTokenSource {
            client,
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        }
    }
}

#[async_trait]
impl TokenSource for SpotifyTokenSource {
    async fn fetch_token(&self) -> Result<ProviderToken, TokenError> {
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(TokenError::NotConfigured);
        }

        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|err| TokenError::Request(err.to_string()))?;

        if !response.status().is_success() {
            return Err(TokenError::Request(format!(
                "status {}",
                response.status()
            )));
        }

        let payload: TokenResponse = response
            .json()
            .await
            .map_err(|err| TokenError::Request(format!("invalid token response: {err}")))?;
        let access_token = payload
            .access_token
            .filter(|token| !token.trim().is_empty())
            .ok_or(TokenError::MissingToken)?;

        let expires_in = payload.expires_in.unwrap_or_else(|| {
            debug!("Spotify token response has no expires_in; assuming {DEFAULT_EXPIRES_IN_SECONDS}s");
            DEFAULT_EXPIRES_IN_SECONDS
        });
        Ok(ProviderToken::from_expires_in(access_token, expires_in))
    }
}

/// Largest valid image of the first artist in a search response.
fn pick_artist_image(payload: ArtistSearchResponse) -> Option<String> {
    let artist = payload.artists?.items.into_iter().next()?;
    let mut images = artist.images;
    images.sort_by(|a, b| b.width.unwrap_or(0).cmp(&a.width.unwrap_or(0)));
    images
        .into_iter()
        .filter_map(|image| image.url)
        .find(|url| is_valid_image_url(url))
}

/// Artist images from the Spotify catalog.
///
/// When Spotify has nothing usable the optional `fallback` provider is asked
/// before giving up.
pub struct SpotifyProvider {
    client: Client,
    api_url: String,
    tokens: Arc<TokenCache>,
    fallback: Option<Arc<dyn ImageProvider>>,
}

impl SpotifyProvider {
    pub fn new(
        client: Client,
        api_url: &str,
        tokens: Arc<TokenCache>,
        fallback: Option<Arc<dyn ImageProvider>>,
    ) -> Self {
        SpotifyProvider {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            tokens,
            fallback,
        }
    }

    async fn search_artist_image(&self, name: &str) -> Result<Option<String>> {
        let token = self.tokens.access_token().await?;

        let response = self
            .client
            .get(format!("{}/v1/search", self.api_url))
            .bearer_auth(token)
            .query(&[("q", name), ("type", "artist"), ("limit", "1")])
            .send()
            .await
            .map_err(|err| anyhow!("Spotify search request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Spotify search failed with status {}",
                response.status()
            ));
        }

        let payload: ArtistSearchResponse = response
            .json()
            .await
            .map_err(|err| anyhow!("Invalid Spotify search response: {err}"))?;
        Ok(pick_artist_image(payload))
    }
}

#[async_trait]
impl ImageProvider for SpotifyProvider {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn resolve(&self, name: &str) -> Option<String> {
        match self.search_artist_image(name).await {
            Ok(Some(url)) => return Some(url),
            Ok(None) => debug!("Spotify returned no usable image for '{name}'"),
            Err(err) => warn!("Error getting Spotify artist image for '{name}': {err}"),
        }

        let fallback = self.fallback.as_ref()?;
        debug!("Trying {} after Spotify for '{name}'", fallback.name());
        fallback.resolve(name).await
    }
}
