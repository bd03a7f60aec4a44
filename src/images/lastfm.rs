use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::images::validate::is_valid_image_url;
use crate::images::ImageProvider;

const SIZE_PREFERENCE: [&str; 3] = ["large", "medium", "extralarge"];

#[derive(Debug, Deserialize)]
struct ArtistInfoResponse {
    artist: Option<LastfmArtist>,
}

#[derive(Debug, Deserialize)]
struct LastfmArtist {
    #[serde(default)]
    image: Vec<LastfmImage>,
}

#[derive(Debug, Deserialize)]
struct LastfmImage {
    #[serde(default)]
    size: String,
    #[serde(rename = "#text", default)]
    text: String,
}

fn pick_image(payload: ArtistInfoResponse) -> Option<String> {
    let images = payload.artist?.image;
    SIZE_PREFERENCE.iter().find_map(|size| {
        images
            .iter()
            .find(|image| image.size == *size)
            .map(|image| image.text.trim())
            .filter(|url| !url.is_empty() && is_valid_image_url(url))
            .map(str::to_string)
    })
}

/// Artist images from Last.fm's `artist.getinfo`.
pub struct LastfmProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

impl LastfmProvider {
    pub fn new(client: Client, api_url: &str, api_key: &str) -> Self {
        LastfmProvider {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.trim().to_string(),
        }
    }

    async fn artist_image(&self, name: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("method", "artist.getinfo"),
                ("artist", name),
                ("api_key", self.api_key.as_str()),
                ("format", "json"),
                ("autocorrect", "1"),
            ])
            .send()
            .await
            .map_err(|err| anyhow!("Last.fm request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Last.fm request failed with status {}",
                response.status()
            ));
        }

        let payload: ArtistInfoResponse = response
            .json()
            .await
            .map_err(|err| anyhow!("Invalid Last.fm response: {err}"))?;
        Ok(pick_image(payload))
    }
}

#[async_trait]
impl ImageProvider for LastfmProvider {
    fn name(&self) -> &'static str {
        "lastfm"
    }

    async fn resolve(&self, name: &str) -> Option<String> {
        if self.api_key.is_empty() {
            debug!("LASTFM_API_KEY is not configured");
            return None;
        }

        match self.artist_image(name).await {
            Ok(found) => found,
            Err(err) => {
                warn!("Error getting Last.fm image for '{name}': {err}");
                None
            }
        }
    }
}
