//! Output module for persisting crawl results
//!
//! This module handles:
//! - Writing the [`CrawlResult`] as pretty JSON
//! - Saving captured screenshots as image files
//! - Printing a console summary of a run

pub mod stats;

pub use stats::{print_summary, CrawlStatistics};

use crate::config::ImageFormat;
use crate::crawler::{CrawlResult, PageFetchResult};
use crate::Result;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the result as pretty-printed JSON
///
/// # Arguments
///
/// * `result` - The crawl result
/// * `path` - Output file, or `None` for stdout
pub fn write_result_json(result: &CrawlResult, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(result)?;

    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, json)?;
            tracing::info!("Wrote crawl result to {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            handle.write_all(json.as_bytes())?;
            handle.write_all(b"\n")?;
        }
    }

    Ok(())
}

/// Saves every captured screenshot under `dir`
///
/// Files are named `<index>-<slug>-<viewport>.<ext>`, with index 000 for the
/// homepage and the rest in result order.
///
/// # Returns
///
/// Paths of the written files.
pub fn save_screenshots(
    result: &CrawlResult,
    dir: &Path,
    format: ImageFormat,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    for (index, page) in result.all_pages().enumerate() {
        let stem = format!("{:03}-{}", index, slug(page));
        let shots = [
            ("desktop", page.screenshots.desktop.as_ref()),
            ("mobile", page.screenshots.mobile.as_ref()),
        ];

        for (viewport, bytes) in shots {
            let Some(bytes) = bytes else { continue };
            let path = dir.join(format!("{}-{}.{}", stem, viewport, format.extension()));
            fs::write(&path, bytes)?;
            written.push(path);
        }
    }

    tracing::info!("Saved {} screenshots to {}", written.len(), dir.display());
    Ok(written)
}

/// Filesystem-safe name derived from the page path
fn slug(page: &PageFetchResult) -> String {
    let path = url::Url::parse(&page.url)
        .map(|u| u.path().to_string())
        .unwrap_or_default();

    let slug: String = path
        .trim_matches('/')
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        "homepage".to_string()
    } else {
        slug.chars().take(80).collect()
    }
}
