use std::env;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;

use crate::images::batch::DEFAULT_BATCH_SIZE;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const DEFAULT_SPOTIFY_API_URL: &str = "https://api.spotify.com";
pub const DEFAULT_TMDB_API_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_TMDB_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";
pub const DEFAULT_WIKIPEDIA_API_URL: &str = "https://ja.wikipedia.org/w/api.php";
pub const DEFAULT_LASTFM_API_URL: &str = "https://ws.audioscrobbler.com/2.0/";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: f32,
    pub recommendation_language: String,
    pub spotify_client_id: String,
    pub spotify_client_secret: String,
    pub spotify_accounts_url: String,
    pub spotify_api_url: String,
    pub tmdb_api_key: String,
    pub tmdb_api_url: String,
    pub tmdb_image_base_url: String,
    pub tmdb_image_size: String,
    pub tmdb_language: String,
    pub wikipedia_api_url: String,
    pub wikipedia_thumb_size: u32,
    pub lastfm_api_key: String,
    pub lastfm_api_url: String,
    pub provider_timeout_seconds: u64,
    pub llm_timeout_seconds: u64,
    pub image_cache_ttl_seconds: u64,
    pub related_items_cache_ttl_seconds: u64,
    pub image_batch_size: usize,
    pub max_items_per_category: usize,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_u32(name: &str, default: u32) -> u32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

fn normalize_base_url(name: &str, value: String, default: &str) -> String {
    let trimmed = value.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return default.trim_end_matches('/').to_string();
    }
    if url::Url::parse(trimmed).is_err() {
        warn!("{name} value '{value}' is not a valid URL; falling back to {default}");
        return default.trim_end_matches('/').to_string();
    }
    trimmed.to_string()
}

fn normalize_image_size(value: String) -> String {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        "w500".to_string()
    } else {
        trimmed.to_string()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let provider_timeout_seconds = env_u64("PROVIDER_TIMEOUT_SECONDS", 8);
        if provider_timeout_seconds == 0 {
            return Err(anyhow!("PROVIDER_TIMEOUT_SECONDS must be greater than zero"));
        }
        let llm_timeout_seconds = env_u64("LLM_TIMEOUT_SECONDS", 60);
        if llm_timeout_seconds == 0 {
            return Err(anyhow!("LLM_TIMEOUT_SECONDS must be greater than zero"));
        }

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            openai_api_key: env_string("OPENAI_API_KEY", ""),
            openai_base_url: normalize_base_url(
                "OPENAI_BASE_URL",
                env_string("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL),
                DEFAULT_OPENAI_BASE_URL,
            ),
            openai_model: env_string("OPENAI_MODEL", "gpt-3.5-turbo"),
            openai_temperature: env_f32("OPENAI_TEMPERATURE", 0.7),
            recommendation_language: env_string("RECOMMENDATION_LANGUAGE", "Japanese"),
            spotify_client_id: env_string("SPOTIFY_CLIENT_ID", ""),
            spotify_client_secret: env_string("SPOTIFY_CLIENT_SECRET", ""),
            spotify_accounts_url: normalize_base_url(
                "SPOTIFY_ACCOUNTS_URL",
                env_string("SPOTIFY_ACCOUNTS_URL", DEFAULT_SPOTIFY_ACCOUNTS_URL),
                DEFAULT_SPOTIFY_ACCOUNTS_URL,
            ),
            spotify_api_url: normalize_base_url(
                "SPOTIFY_API_URL",
                env_string("SPOTIFY_API_URL", DEFAULT_SPOTIFY_API_URL),
                DEFAULT_SPOTIFY_API_URL,
            ),
            tmdb_api_key: env_string("TMDB_API_KEY", ""),
            tmdb_api_url: normalize_base_url(
                "TMDB_API_URL",
                env_string("TMDB_API_URL", DEFAULT_TMDB_API_URL),
                DEFAULT_TMDB_API_URL,
            ),
            tmdb_image_base_url: normalize_base_url(
                "TMDB_IMAGE_BASE_URL",
                env_string("TMDB_IMAGE_BASE_URL", DEFAULT_TMDB_IMAGE_BASE_URL),
                DEFAULT_TMDB_IMAGE_BASE_URL,
            ),
            tmdb_image_size: normalize_image_size(env_string("TMDB_IMAGE_SIZE", "w500")),
            tmdb_language: env_string("TMDB_LANGUAGE", "ja-JP"),
            wikipedia_api_url: normalize_base_url(
                "WIKIPEDIA_API_URL",
                env_string("WIKIPEDIA_API_URL", DEFAULT_WIKIPEDIA_API_URL),
                DEFAULT_WIKIPEDIA_API_URL,
            ),
            wikipedia_thumb_size: env_u32("WIKIPEDIA_THUMB_SIZE", 500).max(1),
            lastfm_api_key: env_string("LASTFM_API_KEY", ""),
            lastfm_api_url: normalize_base_url(
                "LASTFM_API_URL",
                env_string("LASTFM_API_URL", DEFAULT_LASTFM_API_URL),
                DEFAULT_LASTFM_API_URL,
            ),
            provider_timeout_seconds,
            llm_timeout_seconds,
            image_cache_ttl_seconds: env_u64("IMAGE_CACHE_TTL_SECONDS", 60 * 60),
            related_items_cache_ttl_seconds: env_u64("RELATED_ITEMS_CACHE_TTL_SECONDS", 60 * 60),
            image_batch_size: env_usize("IMAGE_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            max_items_per_category: env_usize("MAX_ITEMS_PER_CATEGORY", 10).max(1),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_urls_lose_trailing_slashes() {
        let value = normalize_base_url("X", "https://api.example.com/v1/".to_string(), "https://d");
        assert_eq!(value, "https://api.example.com/v1");
    }

    #[test]
    fn invalid_base_url_falls_back_to_default() {
        let value = normalize_base_url("X", "not a url".to_string(), DEFAULT_TMDB_API_URL);
        assert_eq!(value, DEFAULT_TMDB_API_URL);
    }

    #[test]
    fn image_size_is_stripped_of_slashes() {
        assert_eq!(normalize_image_size("/w780/".to_string()), "w780");
        assert_eq!(normalize_image_size("  ".to_string()), "w500");
    }
}
