//! Scraping stages of the pipeline.
//!
//! 1. **Listing** ([`listing`]): scan a start page and pick candidate
//!    article links by heuristic scoring
//! 2. **Detail** ([`detail`]): fetch each candidate and extract structured
//!    fields through the LLM, at most a few pages at a time
//!
//! Both stages fetch through [`page::PageFetcher`], which downloads a page
//! and reduces it to text, metadata and hyperlinks. Failed fetches are
//! logged and skipped without failing the run.

pub mod detail;
pub mod listing;
pub mod page;
