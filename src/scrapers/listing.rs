//! Listing page scanner.
//!
//! Finds candidate article links on an arbitrary news listing page without
//! any site-specific selectors. Every hyperlink on the page is resolved,
//! restricted to the start URL's root domain, screened against a set of
//! administrative keywords, and scored by URL shape and title length.
//!
//! # Scoring
//!
//! A link is a candidate when either
//! - its path contains a run of at least 4 digits (article id or date) and
//!   ends in a static-page extension, or
//! - its path is at least 2 segments deep and its title is longer than
//!   12 characters.
//!
//! Sites matching neither rule fall back to "same-domain link with a title
//! longer than 15 characters", still screened for administrative terms.

use crate::models::{
    Article, DEFAULT_KEYWORDS, DEFAULT_LANGUAGE, ExtractionResult, UNTITLED,
};
use crate::scrapers::page::{FetchedPage, Link, PageFetcher};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

/// Administrative and navigational terms that never denote a news article.
static EXCLUDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(about|contact|join|login|register|copyright|help|search|feedback|service|career|privacy|member|legal|apply|关于|联系|招聘|声明|登录|注册|下载)",
    )
    .expect("valid exclusion regex")
});

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]{4,}").expect("valid digit regex"));

const ARTICLE_EXTENSIONS: [&str; 5] = [".html", ".shtml", ".htm", ".php", ".jsp"];

/// Titles shorter than this are looked up in the raw HTML.
const MIN_TITLE_CHARS: usize = 5;
const DEEP_PATH_MIN_TITLE_CHARS: usize = 12;
const FALLBACK_MIN_TITLE_CHARS: usize = 15;

/// Last two dot-separated labels of `host` (`fd.bjx.com.cn` -> `com.cn`).
pub fn root_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

/// Whether a URL or title mentions an administrative term.
pub fn is_excluded(url: &str, title: &str) -> bool {
    EXCLUDE_PATTERN.is_match(url) || EXCLUDE_PATTERN.is_match(title)
}

/// `url` with percent-escapes decoded, so non-ASCII path segments can be
/// screened by [`is_excluded`].
fn decoded(url: &Url) -> String {
    urlencoding::decode(url.as_str())
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| url.to_string())
}

/// Score a link by URL path and title.
pub fn looks_like_article(path: &str, title: &str) -> bool {
    let path = path.to_lowercase();
    let has_id = DIGIT_RUN.is_match(&path);
    let is_article_ext =
        path.is_empty() || path == "/" || ARTICLE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    let depth = path.split('/').filter(|segment| !segment.is_empty()).count();

    (has_id && is_article_ext) || (depth >= 2 && title.chars().count() > DEEP_PATH_MIN_TITLE_CHARS)
}

/// Find a `title="..."` attribute following `href` inside the same tag.
pub fn recover_title(html: &str, href: &str) -> Option<String> {
    let pattern = format!(
        r#"(?i)href=["']{}["'][^>]*title=["']([^"']+)["']"#,
        regex::escape(href)
    );
    let re = Regex::new(&pattern).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Resolve `href` against `base` and check it stays within `root`.
fn resolve_same_site(base: &Url, href: &str, root: &str) -> Option<Url> {
    let resolved = base.join(href).ok()?;
    let in_site = resolved.host_str()?.contains(root);
    in_site.then_some(resolved)
}

/// Pick candidate articles from a fetched listing page.
///
/// Candidates keep page order; a URL reached through several links is kept
/// once, under its first title.
pub fn select_candidates(start_url: &Url, page: &FetchedPage) -> Vec<Article> {
    let root = root_domain(start_url.host_str().unwrap_or_default());

    let scored: Vec<Article> = page
        .links
        .all()
        .filter_map(|link| score_link(start_url, &root, link, &page.html))
        .unique_by(|article| article.url.clone())
        .collect();
    if !scored.is_empty() {
        return scored;
    }

    warn!("Heuristic scoring found nothing; falling back to title-length scan");
    page.links
        .all()
        .filter_map(|link| {
            let resolved = resolve_same_site(start_url, &link.href, &root)?;
            let title = link.text.trim();
            if title.chars().count() <= FALLBACK_MIN_TITLE_CHARS || is_excluded(&decoded(&resolved), title) {
                return None;
            }
            Some(Article::stub(title, resolved.as_str()))
        })
        .unique_by(|article| article.url.clone())
        .collect()
}

fn score_link(start_url: &Url, root: &str, link: &Link, html: &str) -> Option<Article> {
    let resolved = resolve_same_site(start_url, &link.href, root)?;

    let mut title = link.text.trim().to_string();
    if title.chars().count() < MIN_TITLE_CHARS {
        if let Some(recovered) = recover_title(html, &link.href) {
            title = recovered;
        }
    }

    if is_excluded(&decoded(&resolved), &title) {
        return None;
    }
    if !looks_like_article(resolved.path(), &title) {
        return None;
    }

    if title.is_empty() {
        title = UNTITLED.to_string();
    }
    Some(Article::stub(title, resolved.as_str()))
}

/// Wrap the candidates of a listing page into an [`ExtractionResult`].
pub fn build_result(start_url: &Url, page: &FetchedPage, articles: Vec<Article>) -> ExtractionResult {
    let keywords = if page.keywords.is_empty() {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    } else {
        page.keywords.clone()
    };
    ExtractionResult {
        source_url: start_url.to_string(),
        website_title: page
            .title
            .clone()
            .unwrap_or_else(|| start_url.host_str().unwrap_or_default().to_string()),
        articles,
        keywords,
        page_language: page
            .lang
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
    }
}

/// Fetch the listing page at `start_url` and collect its candidate articles.
///
/// Returns `None` when the URL is invalid, the fetch fails, or the server
/// does not answer successfully.
#[instrument(level = "info", skip(fetcher))]
pub async fn scan_listing(fetcher: &PageFetcher, start_url: &str) -> Option<ExtractionResult> {
    let url = match Url::parse(start_url) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "Invalid start URL");
            return None;
        }
    };

    let page = match fetcher.fetch(start_url).await {
        Ok(page) => page,
        Err(e) => {
            error!(error = %e, "Listing page fetch failed");
            return None;
        }
    };
    if !page.success {
        error!(status = page.status, "Listing page returned an error status");
        return None;
    }

    info!(links = page.links.len(), "Discovered raw links");
    let articles = select_candidates(&url, &page);
    info!(count = articles.len(), "Identified candidate article links");
    debug!(urls = ?articles.iter().map(|a| &a.url).collect::<Vec<_>>(), "Candidate URLs");

    Some(build_result(&url, &page, articles))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::page::Links;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn page_with_links(url: &str, html: &str, links: Vec<(&str, &str)>) -> FetchedPage {
        FetchedPage {
            url: url.to_string(),
            success: true,
            status: 200,
            html: html.to_string(),
            text: String::new(),
            title: None,
            lang: None,
            keywords: Vec::new(),
            links: Links {
                internal: links
                    .into_iter()
                    .map(|(href, text)| Link {
                        href: href.to_string(),
                        text: text.to_string(),
                    })
                    .collect(),
                external: Vec::new(),
            },
        }
    }

    #[test]
    fn test_root_domain() {
        assert_eq!(root_domain("fd.bjx.com.cn"), "com.cn");
        assert_eq!(root_domain("www.example.com"), "example.com");
        assert_eq!(root_domain("example.com"), "example.com");
        assert_eq!(root_domain("localhost"), "localhost");
    }

    #[test]
    fn test_looks_like_article() {
        assert!(looks_like_article("/news/2024011523.html", "short"));
        assert!(looks_like_article("/a/20240115/123.shtml", ""));
        assert!(!looks_like_article("/news/2024/", "short"));
        assert!(looks_like_article("/news/offshore-wind-auction", "Offshore wind auction opens"));
        assert!(!looks_like_article("/news", "Offshore wind auction opens"));
        assert!(!looks_like_article("/news/offshore", "Too short"));
        // Character count, not bytes: 14 CJK characters.
        assert!(looks_like_article("/xw/detail", "国家能源局发布海上风电新规定"));
    }

    #[test]
    fn test_recover_title() {
        let html = r#"<a class="pic" href="/news/123456.html" target="_blank" title=" 海上风电项目开工 "><img src="a.jpg"></a>"#;
        assert_eq!(
            recover_title(html, "/news/123456.html").as_deref(),
            Some("海上风电项目开工")
        );
        assert_eq!(recover_title(html, "/news/999999.html"), None);
        assert_eq!(recover_title(r#"<a href="/x.html">x</a><span title="no">"#, "/x.html"), None);
    }

    #[test]
    fn test_accepts_article_with_digit_id() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![("/news/2024011523.html", "Offshore tender opens now")],
        );
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://example.com/news/2024011523.html");
        assert_eq!(candidates[0].title, "Offshore tender opens now");
    }

    #[test]
    fn test_rejects_excluded_keywords() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![
                ("/about/team.html", "Meet the whole team here"),
                ("/news/20240115.html", "Login to read the full story"),
                ("/news/20240116.html", "关于我们的风电新闻中心"),
                ("/news/20240117.html", "Turbine deliveries hit record"),
            ],
        );
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates.len(), 1);
        for article in &candidates {
            assert!(!is_excluded(&article.url, &article.title));
        }
    }

    #[test]
    fn test_rejects_excluded_keywords_in_unicode_path() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let html = r#"<a href="/关于/20240115.html">Company overview page text</a>"#;
        let page = FetchedPage::from_html(start.as_str(), 200, html.to_string(), true);
        assert_eq!(page.links.len(), 1);
        assert!(select_candidates(&start, &page).is_empty());
    }

    #[test]
    fn test_fallback_rejects_excluded_keywords_in_unicode_path() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![
                ("/联系", "Reach the regional editorial office"),
                ("/x", "Offshore wind auction results announced"),
            ],
        );
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://example.com/x");
    }

    #[test]
    fn test_rejects_cross_domain_links() {
        let start = Url::parse("https://www.example.com/news/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![
                ("https://other.org/news/20240115.html", "Foreign article with id"),
                ("https://cdn.example.com/news/20240116.html", "Subdomain article with id"),
                ("//example.com.evil.net/news/20240117.html", "Lookalike host article"),
            ],
        );
        let candidates = select_candidates(&start, &page);
        let root = root_domain("www.example.com");
        for article in &candidates {
            let host = Url::parse(&article.url).unwrap().host_str().unwrap().to_string();
            assert!(host.contains(&root));
        }
        assert!(candidates.iter().all(|a| !a.url.contains("other.org")));
        assert!(candidates.iter().any(|a| a.url.contains("cdn.example.com")));
    }

    #[test]
    fn test_deduplicates_by_absolute_url() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![
                ("/news/20240115.html", "First anchor for the story"),
                ("https://example.com/news/20240115.html", "Second anchor for the story"),
                ("20240115.html", "Relative anchor for the story"),
            ],
        );
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "First anchor for the story");
    }

    #[test]
    fn test_short_title_recovered_from_html() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let html = r#"<a href="/news/20240115.html" title="Grid connection milestone reached">more</a>"#;
        let page = page_with_links(start.as_str(), html, vec![("/news/20240115.html", "more")]);
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates[0].title, "Grid connection milestone reached");
    }

    #[test]
    fn test_untitled_when_nothing_recovered() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(start.as_str(), "", vec![("/news/20240115.html", "")]);
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates[0].title, UNTITLED);
    }

    #[test]
    fn test_fallback_uses_title_length() {
        let start = Url::parse("https://example.com/").unwrap();
        let page = page_with_links(
            start.as_str(),
            "",
            vec![
                ("/wind", "Wind energy outlook for the coming decade"),
                ("/solar", "Solar"),
            ],
        );
        let candidates = select_candidates(&start, &page);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://example.com/wind");
    }

    #[test]
    fn test_build_result_defaults() {
        let start = Url::parse("https://example.com/news/").unwrap();
        let page = page_with_links(start.as_str(), "", vec![]);
        let result = build_result(&start, &page, Vec::new());
        assert_eq!(result.website_title, "example.com");
        assert_eq!(result.keywords, vec!["WindPower", "Energy_Intelligence"]);
        assert_eq!(result.page_language, "zh");
    }

    #[tokio::test]
    async fn test_scan_listing_end_to_end() {
        let server = MockServer::start().await;
        let body = r#"<html lang="en"><head><title>Wind Daily</title></head><body>
            <a href="/news/20240301001.html">Blade factory opens in Jiangsu</a>
            <a href="/contact.html">Contact</a>
            <a href="/news/20240301001.html">Blade factory opens in Jiangsu</a>
        </body></html>"#;
        Mock::given(method("GET"))
            .and(path("/news/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new("test", Duration::from_secs(5), Duration::ZERO, true).unwrap();
        let result = scan_listing(&fetcher, &format!("{}/news/", server.uri()))
            .await
            .unwrap();
        assert_eq!(result.website_title, "Wind Daily");
        assert_eq!(result.page_language, "en");
        assert_eq!(result.articles.len(), 1);
        assert!(result.articles[0].url.ends_with("/news/20240301001.html"));
    }

    #[tokio::test]
    async fn test_scan_listing_fails_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new("test", Duration::from_secs(5), Duration::ZERO, true).unwrap();
        assert!(scan_listing(&fetcher, &server.uri()).await.is_none());
    }
}
