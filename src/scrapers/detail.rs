//! Detail page extraction.
//!
//! Each candidate from the listing stage is fetched on its own, its text is
//! handed to the LLM for structured extraction, and gaps in the model's
//! answer are filled locally:
//!
//! | Field | Fallback |
//! |-------|----------|
//! | `title` | the listing stub's title |
//! | `url` | always the URL that was fetched |
//! | `summary` | first 300 characters of the page text plus `...` |
//! | `publish_date` | date pattern in the page text, then an 8-digit date in the URL |
//!
//! Any failure drops the article; nothing is retried.

use crate::api::AskAsync;
use crate::models::Article;
use crate::scrapers::page::PageFetcher;
use crate::utils::{take_chars, truncate_for_log};
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::error::Error;
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

/// Characters of page text used for a synthesized summary.
const SUMMARY_FALLBACK_CHARS: usize = 300;

/// LLM dates shorter than this are treated as missing.
const MIN_DATE_LEN: usize = 8;

static TEXT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{4})[年/-]([0-9]{1,2})[月/-]([0-9]{1,2})").expect("valid text date regex")
});

static URL_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"202[0-9]{5}").expect("valid url date regex"));

/// Fetches candidate pages and turns them into enriched articles.
///
/// At most `concurrency` candidates hold a slot at any time; a slot covers
/// both the page fetch and the LLM call.
pub struct DetailExtractor<A> {
    fetcher: PageFetcher,
    llm: A,
    slots: Semaphore,
    error_markers: Vec<String>,
    max_input_chars: usize,
}

impl<A> DetailExtractor<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(
        fetcher: PageFetcher,
        llm: A,
        concurrency: usize,
        error_markers: Vec<String>,
        max_input_chars: usize,
    ) -> Self {
        Self {
            fetcher,
            llm,
            slots: Semaphore::new(concurrency.max(1)),
            error_markers,
            max_input_chars,
        }
    }

    /// Extract every candidate concurrently.
    ///
    /// Failed candidates are left out; survivors keep candidate order.
    #[instrument(level = "info", skip_all, fields(candidates = stubs.len()))]
    pub async fn extract_all(&self, stubs: &[Article]) -> Vec<Article> {
        let results = join_all(stubs.iter().map(|stub| self.extract(stub))).await;
        let articles: Vec<Article> = results.into_iter().flatten().collect();
        info!(
            succeeded = articles.len(),
            failed = stubs.len() - articles.len(),
            "Detail extraction finished"
        );
        articles
    }

    /// Fetch one candidate page and build its enriched [`Article`].
    #[instrument(level = "info", skip_all, fields(url = %stub.url))]
    pub async fn extract(&self, stub: &Article) -> Option<Article> {
        let _permit = self.slots.acquire().await.ok()?;
        info!(title = %take_chars(&stub.title, 15), "Opening detail page");

        let page = match self.fetcher.fetch(&stub.url).await {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, "Detail page fetch failed");
                return None;
            }
        };
        if !page.success {
            warn!(status = page.status, "Detail page returned an error status");
            return None;
        }
        if let Some(marker) = self.error_markers.iter().find(|m| page.text.contains(m.as_str())) {
            warn!(%marker, "Detail page looks like an error page");
            return None;
        }

        let input = format!(
            "URL: {}\n\n{}",
            stub.url,
            take_chars(&page.text, self.max_input_chars)
        );
        let reply = match self.llm.ask(&input).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "LLM extraction failed");
                return None;
            }
        };

        let fields = match parse_llm_fields(&reply) {
            Ok(fields) => fields,
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&reply, 300),
                    "Model returned non-conforming JSON; skipping article"
                );
                return None;
            }
        };

        match enrich(stub, &page.text, fields) {
            Ok(article) => {
                info!(
                    title = %take_chars(&article.title, 10),
                    date = ?article.publish_date,
                    category = %article.category,
                    "Article analysed"
                );
                Some(article)
            }
            Err(e) => {
                warn!(error = %e, "Extracted fields do not form a valid article");
                None
            }
        }
    }
}

/// Parse the model's reply into a field map.
///
/// Markdown code fences are ignored. An array reply contributes its first
/// element and an empty array yields no fields.
pub fn parse_llm_fields(reply: &str) -> Result<Map<String, Value>, Box<dyn Error>> {
    let value: Value = serde_json::from_str(strip_code_fence(reply))?;
    let first = match value {
        Value::Array(items) => match items.into_iter().next() {
            Some(item) => item,
            None => return Ok(Map::new()),
        },
        other => other,
    };
    match first {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(format!("expected a JSON object, got {other}").into()),
    }
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().trim_end_matches("```").trim()
}

/// Fill gaps in the model's fields and build the article.
///
/// Fails only when the fields cannot form a valid [`Article`].
pub fn enrich(
    stub: &Article,
    page_text: &str,
    mut fields: Map<String, Value>,
) -> Result<Article, serde_json::Error> {
    if is_blank(fields.get("title")) {
        fields.insert("title".into(), Value::String(stub.title.clone()));
    }
    fields.insert("url".into(), Value::String(stub.url.clone()));

    if is_blank(fields.get("summary")) {
        fields.insert("summary".into(), Value::String(fallback_summary(page_text)));
    }

    let date_ok = fields
        .get("publish_date")
        .filter(|v| !is_blank(Some(*v)))
        .is_some_and(|v| value_len(v) >= MIN_DATE_LEN);
    if !date_ok {
        if let Some(date) = date_from_text(page_text).or_else(|| date_from_url(&stub.url)) {
            fields.insert("publish_date".into(), Value::String(date));
        }
    }

    serde_json::from_value(Value::Object(fields))
}

/// First 300 characters of the page text on one line, followed by `...`.
pub fn fallback_summary(page_text: &str) -> String {
    format!(
        "{}...",
        take_chars(page_text, SUMMARY_FALLBACK_CHARS).replace('\n', " ")
    )
}

/// First `YYYY-M-D`, `YYYY/M/D` or `YYYY年M月D` date in the text, as `YYYY-MM-DD`.
pub fn date_from_text(text: &str) -> Option<String> {
    let caps = TEXT_DATE.captures(text)?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;
    Some(format!("{}-{:02}-{:02}", &caps[1], month, day))
}

/// First `202xMMDD` run in the URL, as `YYYY-MM-DD`.
pub fn date_from_url(url: &str) -> Option<String> {
    let m = URL_DATE.find(url)?.as_str();
    Some(format!("{}-{}-{}", &m[..4], &m[4..6], &m[6..]))
}

/// Missing, null, empty or false.
fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(Value::Object(o)) => o.is_empty(),
        Some(Value::Number(n)) => n.as_f64() == Some(0.0),
        Some(Value::Bool(true)) => false,
    }
}

fn value_len(value: &Value) -> usize {
    match value {
        Value::String(s) => s.chars().count(),
        other => other.to_string().chars().count(),
    }
}
