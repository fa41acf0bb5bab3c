//! Markdown analysis report.
//!
//! Articles are grouped into the fixed [`Category`] sections, shown in the
//! order policy, technical, market, other. Empty sections are left out.
//!
//! ```text
//! # 🌬️ Wind Daily - Analysis Report
//!
//! ## 📜 Policy & Regulation (2 articles)
//!
//! ### 1. New tariff rules for offshore wind
//! - **Date**: 2024-01-15 | **Tags**: `NEA, tariff` | **Features**: 🏗️ Project
//! > Summary of the article...
//!
//! [🔗 Read original](https://example.com/news/1.html)
//! ```

use crate::models::{Article, Category, ExtractionResult};
use chrono::{DateTime, Local};
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// File name of the report inside a run folder.
pub const REPORT_FILE: &str = "Wind_Analysis_Report.md";

/// Group articles by category in display order, skipping empty groups.
pub fn group_by_category(articles: &[Article]) -> Vec<(Category, Vec<&Article>)> {
    Category::DISPLAY_ORDER
        .iter()
        .map(|&category| {
            let members = articles
                .iter()
                .filter(|article| article.category == category)
                .collect::<Vec<_>>();
            (category, members)
        })
        .filter(|(_, members)| !members.is_empty())
        .collect()
}

/// Render the full report for `data`.
pub fn render_report(data: &ExtractionResult, generated_at: DateTime<Local>) -> String {
    let mut md = String::new();

    writeln!(md, "# 🌬️ {} - Analysis Report\n", data.website_title).unwrap();
    writeln!(md, "**Source**: {}  ", data.source_url).unwrap();
    writeln!(md, "**Generated**: {}  ", generated_at.format("%Y-%m-%d %H:%M")).unwrap();
    writeln!(md, "**Site keywords**: {}\n", data.keywords.join(", ")).unwrap();
    writeln!(md, "---").unwrap();

    for (category, articles) in group_by_category(&data.articles) {
        writeln!(
            md,
            "\n## {} ({} {})\n",
            category.heading(),
            articles.len(),
            if articles.len() == 1 { "article" } else { "articles" }
        )
        .unwrap();

        for (idx, article) in articles.iter().enumerate() {
            render_article(&mut md, idx + 1, article);
        }

        writeln!(md, "---").unwrap();
    }

    md
}

fn render_article(md: &mut String, idx: usize, article: &Article) {
    let mut flags = Vec::new();
    if article.has_project_info {
        flags.push("🏗️ Project");
    }
    if article.has_technical_specs {
        flags.push("📏 Specs");
    }
    let flag_str = if flags.is_empty() {
        String::new()
    } else {
        format!(" | **Features**: {}", flags.join(" "))
    };

    writeln!(md, "### {}. {}", idx, article.title).unwrap();
    writeln!(
        md,
        "- **Date**: {} | **Tags**: `{}`{}",
        article.publish_date.as_deref().unwrap_or("unknown"),
        article.tags.join(", "),
        flag_str
    )
    .unwrap();

    let summary = match article.summary.as_deref() {
        Some(s) if !s.is_empty() => s.replace('\n', "\n> "),
        _ => "No summary available".to_string(),
    };
    writeln!(md, "> {}\n", summary).unwrap();
    writeln!(md, "[🔗 Read original]({})\n", article.url).unwrap();
}

/// Render and write the report to `{run_folder}/Wind_Analysis_Report.md`.
#[instrument(level = "info", skip_all, fields(run_folder = %run_folder.display()))]
pub async fn write_report(
    data: &ExtractionResult,
    run_folder: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let md = render_report(data, Local::now());
    let path = run_folder.join(REPORT_FILE);
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote analysis report");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article(title: &str, category: &str) -> Article {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "url": format!("https://example.com/news/{}.html", title.len()),
            "category": category,
        }))
        .unwrap()
    }

    fn result(articles: Vec<Article>) -> ExtractionResult {
        ExtractionResult {
            source_url: "https://example.com/news/".to_string(),
            website_title: "Wind Daily".to_string(),
            articles,
            keywords: vec!["WindPower".to_string(), "Energy_Intelligence".to_string()],
            page_language: "en".to_string(),
        }
    }

    #[test]
    fn test_loose_category_lands_in_policy() {
        let articles = vec![article("Subsidy notice", "能源政策动态")];
        let groups = group_by_category(&articles);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, Category::Policy);
    }

    #[test]
    fn test_groups_follow_display_order() {
        let articles = vec![
            article("a", "other"),
            article("bb", "Market news"),
            article("ccc", "技术"),
            article("dddd", "Policy"),
            article("eeeee", "market"),
        ];
        let groups = group_by_category(&articles);
        let order: Vec<Category> = groups.iter().map(|(c, _)| *c).collect();
        assert_eq!(
            order,
            vec![Category::Policy, Category::Technical, Category::Market, Category::Other]
        );
        assert_eq!(groups[2].1.len(), 2);
    }

    #[test]
    fn test_render_report_layout() {
        let mut first = article("Offshore tariff reform", "policy");
        first.publish_date = Some("2024-01-15".to_string());
        first.tags = vec!["NEA".to_string(), "tariff".to_string()];
        first.summary = Some("Line one\nLine two".to_string());
        first.has_project_info = true;
        first.has_technical_specs = true;
        let second = article("Blade plant", "technical");

        let generated_at = Local.with_ymd_and_hms(2024, 1, 16, 9, 5, 0).unwrap();
        let md = render_report(&result(vec![second, first]), generated_at);

        assert!(md.starts_with("# 🌬️ Wind Daily - Analysis Report\n"));
        assert!(md.contains("**Generated**: 2024-01-16 09:05"));
        assert!(md.contains("**Site keywords**: WindPower, Energy_Intelligence"));
        assert!(md.contains("## 📜 Policy & Regulation (1 article)"));
        assert!(md.contains("### 1. Offshore tariff reform"));
        assert!(md.contains(
            "- **Date**: 2024-01-15 | **Tags**: `NEA, tariff` | **Features**: 🏗️ Project 📏 Specs"
        ));
        assert!(md.contains("> Line one\n> Line two\n"));
        assert!(md.contains("- **Date**: unknown | **Tags**: ``\n> No summary available"));
        assert!(!md.contains("Market"));

        let policy = md.find("Policy & Regulation").unwrap();
        let tech = md.find("⚙️ Technology").unwrap();
        assert!(policy < tech);
    }

    #[tokio::test]
    async fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_report(&result(vec![article("x", "other")]), dir.path())
            .await
            .unwrap();
        assert!(path.ends_with("Wind_Analysis_Report.md"));
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.contains("## 🔗 Other News (1 article)"));
    }
}
