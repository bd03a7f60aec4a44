use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::images::Category;
use crate::llm::openai::{truncate_for_log, ChatClient};
use crate::models::Item;

const SYSTEM_PROMPT: &str = "You are an expert on entertainment and culture. You recommend related artists, people, works and brands and always answer with JSON.";

#[derive(Debug, Deserialize)]
struct RelatedItemsPayload {
    #[serde(default)]
    items: Vec<Item>,
}

/// Source of related items for a query within one category.
#[async_trait]
pub trait RelatedItemsSource: Send + Sync {
    async fn related_items(&self, query: &str, category: Category) -> Result<Vec<Item>>;
}

fn category_label(category: Category) -> &'static str {
    match category {
        Category::Artist => "music artists",
        Category::Celebrity => "celebrities or influencers",
        Category::Movie => "movies",
        Category::Anime => "anime titles",
        Category::Fashion => "fashion brands",
    }
}

fn category_rules(category: Category) -> &'static str {
    match category {
        Category::Artist => "- Individuals or groups whose main activity is music (composing, writing, performing, singing).\n- Actors or entertainers whose music activity is secondary may be included.\n- Limit to bands, solo artists and music groups.",
        Category::Celebrity => "- Real individual people only.\n- Exclude groups, units and organisations.\n- Exclude fictional characters.",
        Category::Movie => "- Commercially released live-action films only.\n- Exclude animated works.\n- Documentaries and experimental films are allowed.",
        Category::Anime => "- Commercially released animated works only.\n- TV anime, theatrical anime and OVAs are allowed.\n- Exclude live-action works.",
        Category::Fashion => "- Brands that plan, manufacture or sell clothing and fashion accessories only.",
    }
}

pub fn build_prompt(query: &str, category: Category, language: &str, count: usize) -> String {
    format!(
        "Suggest {count} {label} related to the item below.\n\n\
Category restrictions:\n{rules}\n\n\
Relevance criteria (consider them together):\n\
- Similar atmosphere or style\n\
- Shared fan base\n\
- Past collaborations\n\
- Active in the same era with mutual influence\n\
- Same genre or category\n\
- Publicly expressed admiration for the item on social media or in the press\n\n\
Item: {query}\n\n\
Notes:\n\
- Answer in {language}.\n\
- Prefer the name most commonly used by {language}-speaking audiences.\n\
- Follow the category restrictions strictly.\n\n\
Respond with JSON in this shape:\n\
{{\n  \"items\": [\n    {{\n      \"name\": \"item name\",\n      \"reason\": \"why it is related (under 200 characters)\",\n      \"features\": [\"feature 1\", \"feature 2\", \"feature 3\"]\n    }}\n  ]\n}}",
        count = count,
        label = category_label(category),
        rules = category_rules(category),
        query = query.trim(),
        language = language,
    )
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses the model's JSON answer, dropping nameless entries and capping the
/// list at `max_items`.
pub fn parse_items(content: &str, max_items: usize) -> Result<Vec<Item>> {
    let payload: RelatedItemsPayload = serde_json::from_str(strip_code_fence(content))
        .map_err(|err| {
            anyhow!(
                "Invalid related items JSON ({err}): {}",
                truncate_for_log(content, 300)
            )
        })?;

    let items: Vec<Item> = payload
        .items
        .into_iter()
        .filter_map(|item| {
            let name = item.name.trim();
            if name.is_empty() {
                return None;
            }
            Some(Item {
                name: name.to_string(),
                reason: item.reason.trim().to_string(),
                features: item
                    .features
                    .into_iter()
                    .map(|feature| feature.trim().to_string())
                    .filter(|feature| !feature.is_empty())
                    .collect(),
            })
        })
        .take(max_items)
        .collect();

    if items.is_empty() {
        return Err(anyhow!("Related items response contained no items"));
    }
    Ok(items)
}

/// Related items from a chat model, memoized per `(query, category)`.
pub struct ChatRelatedItems {
    chat: ChatClient,
    cache: TtlCache<Vec<Item>>,
    language: String,
    max_items: usize,
}

impl ChatRelatedItems {
    pub fn new(
        chat: ChatClient,
        cache: TtlCache<Vec<Item>>,
        language: &str,
        max_items: usize,
    ) -> Self {
        ChatRelatedItems {
            chat,
            cache,
            language: language.to_string(),
            max_items: max_items.max(1),
        }
    }
}

#[async_trait]
impl RelatedItemsSource for ChatRelatedItems {
    async fn related_items(&self, query: &str, category: Category) -> Result<Vec<Item>> {
        let cache_key = format!("{}-{}", query.trim(), category.as_str());
        if let Some(items) = self.cache.get(&cache_key) {
            debug!("Related items cache hit for {cache_key}");
            return Ok(items);
        }

        let prompt = build_prompt(query, category, &self.language, self.max_items);
        let operation = format!("related_items:{}", category.as_str());
        let metadata = json!({
            "category": category.as_str(),
            "query_chars": query.trim().chars().count(),
            "max_items": self.max_items,
        });
        let content = self
            .chat
            .complete_json(SYSTEM_PROMPT, &prompt, &operation, Some(metadata))
            .await?;
        let items = parse_items(&content, self.max_items)?;
        info!(
            "Received {} related {} item(s) for '{}'",
            items.len(),
            category.as_str(),
            query.trim()
        );

        self.cache.set(cache_key, items.clone());
        Ok(items)
    }
}
