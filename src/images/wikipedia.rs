use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::images::validate::is_valid_image_url;
use crate::images::ImageProvider;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    pageid: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PageImagesResponse {
    query: Option<PagesQuery>,
}

#[derive(Debug, Deserialize)]
struct PagesQuery {
    #[serde(default)]
    pages: HashMap<String, PageImage>,
}

#[derive(Debug, Deserialize)]
struct PageImage {
    thumbnail: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: Option<String>,
}

fn top_page_id(payload: SearchResponse) -> Option<u64> {
    payload.query?.search.into_iter().next()?.pageid
}

fn thumbnail_source(payload: PageImagesResponse, page_id: u64) -> Option<String> {
    let mut pages = payload.query?.pages;
    let source = pages.remove(&page_id.to_string())?.thumbnail?.source?;
    if is_valid_image_url(&source) {
        Some(source)
    } else {
        None
    }
}

/// Lead images of the best-matching encyclopedia article.
pub struct WikipediaProvider {
    client: Client,
    api_url: String,
    thumb_size: u32,
}

impl WikipediaProvider {
    pub fn new(client: Client, api_url: &str, thumb_size: u32) -> Self {
        WikipediaProvider {
            client,
            api_url: api_url.to_string(),
            thumb_size,
        }
    }

    async fn query<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[("action", "query"), ("format", "json")])
            .query(params)
            .send()
            .await
            .map_err(|err| anyhow!("Wikipedia request failed: {err}"))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Wikipedia request failed with status {}",
                response.status()
            ));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| anyhow!("Invalid Wikipedia response: {err}"))
    }

    async fn find_image(&self, name: &str) -> Result<Option<String>> {
        let search: SearchResponse = self
            .query(&[("list", "search"), ("srsearch", name), ("srlimit", "1")])
            .await?;
        let Some(page_id) = top_page_id(search) else {
            return Ok(None);
        };

        let page_id_text = page_id.to_string();
        let thumb_size = self.thumb_size.to_string();
        let images: PageImagesResponse = self
            .query(&[
                ("prop", "pageimages"),
                ("pithumbsize", thumb_size.as_str()),
                ("pageids", page_id_text.as_str()),
            ])
            .await?;
        Ok(thumbnail_source(images, page_id))
    }
}

#[async_trait]
impl ImageProvider for WikipediaProvider {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn resolve(&self, name: &str) -> Option<String> {
        match self.find_image(name).await {
            Ok(found) => found,
            Err(err) => {
                warn!("Error getting Wikipedia image for '{name}': {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::images::testing::{route, stub_client, StubServer};

    #[test]
    fn takes_the_first_search_hit() {
        let payload: SearchResponse = serde_json::from_value(json!({
            "batchcomplete": "",
            "query": { "search": [
                { "ns": 0, "title": "Comme des Garçons", "pageid": 1234 },
                { "ns": 0, "title": "Other", "pageid": 99 }
            ]}
        }))
        .unwrap();
        assert_eq!(top_page_id(payload), Some(1234));
    }

    #[test]
    fn no_hits_means_no_page() {
        let payload: SearchResponse =
            serde_json::from_value(json!({ "query": { "search": [] } })).unwrap();
        assert_eq!(top_page_id(payload), None);
    }

    #[test]
    fn reads_thumbnail_for_the_requested_page() {
        let payload: PageImagesResponse = serde_json::from_value(json!({
            "query": { "pages": { "1234": {
                "pageid": 1234,
                "thumbnail": { "source": "https://upload.wikimedia.org/a.jpg", "width": 500, "height": 300 },
                "pageimage": "a.jpg"
            }}}
        }))
        .unwrap();
        assert_eq!(
            thumbnail_source(payload, 1234).as_deref(),
            Some("https://upload.wikimedia.org/a.jpg")
        );
    }

    #[test]
    fn page_without_thumbnail_is_none() {
        let payload: PageImagesResponse = serde_json::from_value(json!({
            "query": { "pages": { "1234": { "pageid": 1234, "title": "No image" } } }
        }))
        .unwrap();
        assert_eq!(thumbnail_source(payload, 1234), None);
    }

    fn stub_provider(server: &StubServer) -> WikipediaProvider {
        WikipediaProvider::new(stub_client(), &format!("{}/w/api.php", server.base_url), 500)
    }

    #[tokio::test]
    async fn search_then_page_images() {
        let server = StubServer::start(vec![
            route(
                "list=search",
                200,
                json!({ "query": { "search": [{ "title": "Perfume", "pageid": 42 }] } }),
            ),
            route(
                "prop=pageimages",
                200,
                json!({ "query": { "pages": { "42": {
                    "pageid": 42,
                    "thumbnail": { "source": "https://upload.wikimedia.org/perfume.jpg" }
                }}}}),
            ),
        ])
        .await;
        let provider = stub_provider(&server);

        assert_eq!(
            provider.resolve("Perfume").await.as_deref(),
            Some("https://upload.wikimedia.org/perfume.jpg")
        );
        let targets = server.targets();
        assert_eq!(targets.len(), 2);
        assert!(targets[0].contains("srlimit=1"));
        assert!(targets[1].contains("pithumbsize=500"));
        assert!(targets[1].contains("pageids=42"));
    }

    #[tokio::test]
    async fn no_search_hit_stops_after_one_request() {
        let server = StubServer::start(vec![route(
            "list=search",
            200,
            json!({ "query": { "search": [] } }),
        )])
        .await;
        let provider = stub_provider(&server);

        assert_eq!(provider.resolve("Nothing Here").await, None);
        assert_eq!(server.targets().len(), 1);
    }

    #[tokio::test]
    async fn server_error_is_absorbed() {
        let server = StubServer::start(vec![route("list=search", 502, json!({}))]).await;
        let provider = stub_provider(&server);

        assert_eq!(provider.resolve("Perfume").await, None);
    }
}
