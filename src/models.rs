//! Data models for scanned listing pages and their extracted articles.
//!
//! - [`Article`]: one news article, first as a listing stub and later as the
//!   LLM-enriched record
//! - [`Category`]: the fixed set of report sections an article can land in
//! - [`ExtractionResult`]: everything learned about one listing page
//!
//! Field names are snake_case on the wire; the same names are used in the
//! JSON schema handed to the LLM, so the model's reply deserializes directly.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Title given to listing links whose text could not be recovered.
pub const UNTITLED: &str = "Untitled";

/// Keywords reported when the listing page declares none.
pub const DEFAULT_KEYWORDS: [&str; 2] = ["WindPower", "Energy_Intelligence"];

/// Language reported when the listing page does not declare one.
pub const DEFAULT_LANGUAGE: &str = "zh";

/// Report category of an article.
///
/// Serialized as lowercase English. Deserialization goes through
/// [`Category::from_label`], so loose labels like `"Policy update"` or
/// `"能源政策动态"` are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Technical,
    Policy,
    Market,
    #[default]
    Other,
}

impl Category {
    /// Fixed display order of report sections.
    pub const DISPLAY_ORDER: [Category; 4] = [
        Category::Policy,
        Category::Technical,
        Category::Market,
        Category::Other,
    ];

    /// Map a free-form category label onto a [`Category`].
    ///
    /// Substring match on Chinese and English labels, checked in the order
    /// policy, technical, market. Anything unrecognised is [`Category::Other`].
    pub fn from_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if label.contains("政策") || lower.contains("policy") {
            Category::Policy
        } else if label.contains("技术") || lower.contains("tech") {
            Category::Technical
        } else if label.contains("市场") || lower.contains("market") {
            Category::Market
        } else {
            Category::Other
        }
    }

    /// Section heading used in the markdown report.
    pub fn heading(&self) -> &'static str {
        match self {
            Category::Policy => "📜 Policy & Regulation",
            Category::Technical => "⚙️ Technology",
            Category::Market => "📈 Market",
            Category::Other => "🔗 Other News",
        }
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.as_deref().map(Category::from_label).unwrap_or_default())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Technical => "technical",
            Category::Policy => "policy",
            Category::Market => "market",
            Category::Other => "other",
        };
        f.write_str(s)
    }
}

/// A news article discovered on a listing page.
///
/// The listing scanner creates a stub carrying only `title`, `url` and the
/// default category; detail extraction replaces it with a fully populated
/// record. `url` is the identity of an article within a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Article {
    /// Article headline.
    pub title: String,
    /// Absolute URL of the article page.
    pub url: String,
    /// Core facts of the article (amounts, parameters, companies), at most 150 characters.
    #[serde(default)]
    pub summary: Option<String>,
    /// Exactly one of technical, policy, market, other.
    #[serde(default)]
    pub category: Category,
    /// Publication date formatted as YYYY-MM-DD.
    #[serde(default)]
    pub publish_date: Option<String>,
    /// Whether the article names projects, capacities or similar project data.
    #[serde(default)]
    pub has_project_info: bool,
    /// Whether the article carries turbine models, rotor diameters or other technical parameters.
    #[serde(default)]
    pub has_technical_specs: bool,
    /// Three to five concrete entity keywords.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Article {
    /// Build a listing-stage stub.
    pub fn stub(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: None,
            category: Category::Other,
            publish_date: None,
            has_project_info: false,
            has_technical_specs: false,
            tags: Vec::new(),
        }
    }

    /// JSON schema describing an article, as given to the LLM.
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(Article)).unwrap_or_default()
    }
}

/// Everything extracted from one listing page.
///
/// Populated by the listing scanner with stubs, then its `articles` are
/// replaced by the enriched subset once detail extraction finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// The listing page URL the run started from.
    pub source_url: String,
    /// Title of the listing page.
    pub website_title: String,
    /// Articles found on the page.
    pub articles: Vec<Article>,
    /// Site-level keywords.
    pub keywords: Vec<String>,
    /// Declared page language.
    pub page_language: String,
}
