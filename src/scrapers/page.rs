//! Page fetching and HTML-to-text conversion.
//!
//! [`PageFetcher`] downloads a page with a browser user agent and turns it
//! into a [`FetchedPage`]: the raw HTML, a readable text rendition with
//! navigation, script and overlay content stripped, page metadata, and the
//! page's hyperlinks split into internal and external lists.

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::node::{Element, Node};
use scraper::{ElementRef, Html, Selector};
use std::error::Error;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument};
use url::Url;

/// Tags whose whole subtree is left out of the page text.
const EXCLUDED_TAGS: [&str; 7] = ["head", "nav", "footer", "script", "style", "noscript", "aside"];

/// Tags that start a new line in the page text.
const BLOCK_TAGS: [&str; 22] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "table",
    "section", "article", "header", "main", "blockquote", "pre", "dd", "dt",
];

/// `id`/`class` fragments identifying overlay elements.
const OVERLAY_HINTS: [&str; 4] = ["overlay", "modal", "popup", "cookie"];

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid title selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid link selector"));
static KEYWORDS_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"meta[name="keywords"], meta[name="Keywords"]"#)
        .expect("valid keywords selector")
});

/// A hyperlink found on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// The `href` attribute exactly as written in the HTML.
    pub href: String,
    /// Anchor text with whitespace collapsed.
    pub text: String,
}

/// Hyperlinks of a page, split by whether they stay on the page's host.
#[derive(Debug, Clone, Default)]
pub struct Links {
    pub internal: Vec<Link>,
    pub external: Vec<Link>,
}

impl Links {
    /// Internal links followed by external links.
    pub fn all(&self) -> impl Iterator<Item = &Link> {
        self.internal.iter().chain(self.external.iter())
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }
}

/// A downloaded page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// The URL that was requested.
    pub url: String,
    /// Whether the server answered with a 2xx status.
    pub success: bool,
    pub status: u16,
    pub html: String,
    /// Readable text of the page body.
    pub text: String,
    pub title: Option<String>,
    /// Value of `<html lang>`.
    pub lang: Option<String>,
    /// Entries of `<meta name="keywords">`.
    pub keywords: Vec<String>,
    pub links: Links,
}

impl FetchedPage {
    /// Build a page from already downloaded HTML.
    pub fn from_html(url: &str, status: u16, html: String, remove_overlays: bool) -> Self {
        let document = Html::parse_document(&html);
        let base = Url::parse(url).ok();

        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|t| collapse_whitespace(&t.text().collect::<String>()))
            .filter(|t| !t.is_empty());
        let lang = document
            .root_element()
            .value()
            .attr("lang")
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty());
        let keywords = document
            .select(&KEYWORDS_SELECTOR)
            .next()
            .and_then(|m| m.value().attr("content"))
            .map(|content| {
                content
                    .split([',', '，'])
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let links = match &base {
            Some(base) => collect_links(&document, base),
            None => Links::default(),
        };
        let text = page_text(&document, remove_overlays);

        Self {
            url: url.to_string(),
            success: (200..300).contains(&status),
            status,
            html,
            text,
            title,
            lang,
            keywords,
            links,
        }
    }
}

/// HTTP page fetcher sharing one connection pool.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    settle_delay: Duration,
    remove_overlays: bool,
}

impl PageFetcher {
    pub fn new(
        user_agent: &str,
        timeout: Duration,
        settle_delay: Duration,
        remove_overlays: bool,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            settle_delay,
            remove_overlays,
        })
    }

    /// Fetch `url` and parse it.
    ///
    /// Transport failures are errors; a non-2xx answer is returned as a page
    /// with `success == false`.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, Box<dyn Error>> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        if !self.settle_delay.is_zero() {
            sleep(self.settle_delay).await;
        }
        let html = response.text().await?;
        debug!(status, bytes = html.len(), "Fetched page");
        Ok(FetchedPage::from_html(url, status, html, self.remove_overlays))
    }
}

fn collect_links(document: &Html, base: &Url) -> Links {
    let mut links = Links::default();
    for element in document.select(&LINK_SELECTOR) {
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("javascript:")
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
        {
            continue;
        }
        let Ok(resolved) = base.join(href) else {
            continue;
        };
        let link = Link {
            href: href.to_string(),
            text: collapse_whitespace(&element.text().collect::<String>()),
        };
        if resolved.host_str() == base.host_str() {
            links.internal.push(link);
        } else {
            links.external.push(link);
        }
    }
    links
}

/// Readable text of a document, one block per line.
pub fn page_text(document: &Html, remove_overlays: bool) -> String {
    let mut raw = String::new();
    collect_text(document.root_element(), remove_overlays, &mut raw);
    raw.lines()
        .map(collapse_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_text(element: ElementRef<'_>, remove_overlays: bool, out: &mut String) {
    for child in element.children() {
        match child.value() {
            // Source line breaks are not text line breaks; only block tags are.
            Node::Text(text) => out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c })),
            Node::Element(el) => {
                let name = el.name();
                if EXCLUDED_TAGS.contains(&name) || (remove_overlays && is_overlay(el)) {
                    continue;
                }
                let block = BLOCK_TAGS.contains(&name);
                if block {
                    out.push('\n');
                }
                if let Some(child_ref) = ElementRef::wrap(child) {
                    collect_text(child_ref, remove_overlays, out);
                }
                if block {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

fn is_overlay(el: &Element) -> bool {
    let id = el.id().unwrap_or_default().to_lowercase();
    let class = el.attr("class").unwrap_or_default().to_lowercase();
    OVERLAY_HINTS
        .iter()
        .any(|hint| id.contains(hint) || class.contains(hint))
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
