use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConsentError, Result};
use crate::models::CategoryId;

/// Language every lookup falls back to when the requested one is missing.
pub const DEFAULT_LANG: &str = "en";

/// The widget's configuration document: tracking id plus per-language
/// category descriptions and UI labels. The core only consumes the tracking
/// id; the rest is handed to the presentation layer.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    pub tracking_id: String,

    /// lang -> descriptions of what each category's services do.
    #[serde(default)]
    pub category_descriptions: HashMap<String, CategoryDescriptions>,

    /// One label set per language.
    #[serde(default)]
    pub ui_text: Vec<UiText>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryDescriptions {
    #[serde(default)]
    pub necessary: Vec<ServiceDescription>,
    #[serde(default)]
    pub analytics: Vec<ServiceDescription>,
    #[serde(default)]
    pub marketing: Vec<ServiceDescription>,
    #[serde(default)]
    pub functional: Vec<ServiceDescription>,
    #[serde(default)]
    pub social_media: Vec<ServiceDescription>,
}

impl CategoryDescriptions {
    pub fn for_category(&self, category: CategoryId) -> &[ServiceDescription] {
        match category {
            CategoryId::Necessary => &self.necessary,
            CategoryId::Analytics => &self.analytics,
            CategoryId::Marketing => &self.marketing,
            CategoryId::Functional => &self.functional,
            CategoryId::SocialMedia => &self.social_media,
        }
    }
}

/// Legal-text block for one third-party service within a category.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceDescription {
    pub provider: String,
    pub legal_basis: String,
    pub duration: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub data_transferred: Option<String>,
    #[serde(default)]
    pub withdrawal: Option<String>,
    #[serde(default)]
    pub example: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiText {
    pub lang: String,
    pub title: String,
    pub title_description: String,
    pub accept_all: String,
    pub decline_all: String,
    pub save_selected: String,
    pub details: String,
    pub settings: String,
    /// Category name (snake_case id) -> localized title.
    #[serde(default)]
    pub category_titles: BTreeMap<String, String>,
}

impl WidgetConfig {
    /// Loads the configuration document from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        config.try_deserialize().map_err(ConsentError::Config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(ConsentError::Decode)
    }

    /// Category descriptions for a language, falling back to English.
    pub fn descriptions_for(&self, lang: &str) -> Option<&CategoryDescriptions> {
        self.category_descriptions.get(lang).or_else(|| {
            tracing::warn!(lang, "No category descriptions for language, falling back");
            self.category_descriptions.get(DEFAULT_LANG)
        })
    }

    /// UI labels for a language, falling back to English.
    pub fn ui_text_for(&self, lang: &str) -> Option<&UiText> {
        self.ui_text.iter().find(|t| t.lang == lang).or_else(|| {
            tracing::warn!(lang, "No UI text for language, falling back");
            self.ui_text.iter().find(|t| t.lang == DEFAULT_LANG)
        })
    }
}
