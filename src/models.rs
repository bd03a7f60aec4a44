use serde::{Deserialize, Serialize};

/// A related item suggested by the language model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedItem {
    pub name: String,
    pub reason: String,
    pub features: Vec<String>,
    pub image_url: String,
    pub official_url: String,
}

impl ResolvedItem {
    pub fn from_item(item: &Item, image_url: String, official_url: String) -> Self {
        ResolvedItem {
            name: item.name.clone(),
            reason: item.reason.clone(),
            features: item.features.clone(),
            image_url,
            official_url,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Recommendations {
    pub artists: Vec<ResolvedItem>,
    pub celebrities: Vec<ResolvedItem>,
    pub movies: Vec<ResolvedItem>,
    pub anime: Vec<ResolvedItem>,
    pub fashion: Vec<ResolvedItem>,
}
