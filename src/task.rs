use std::{collections::BTreeSet, path::PathBuf, thread::sleep};

use serde::{Deserialize, Serialize};

use crate::{
    download,
    errors::FetchError,
    extract,
    fetch::{self, FetchMode},
    source::Source,
    videos::{self, VideoSink},
};

pub const IMAGE_SEARCH_BASE: &str = "https://cn.bing.com/images/search";
pub const VIDEO_SEARCH_BASE: &str = "https://search.bilibili.com/all";

/// Referer sent with bing image requests to satisfy hot-link protection.
pub const IMAGE_REFERER: &str = "https://cn.bing.com/images/search";
pub const VIDEO_REFERER: &str = "https://www.bilibili.com/";

const DEFAULT_DELAY_SECS: f64 = 0.5;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Bing image search: murl markers, img-tag fallback.
    #[default]
    Images,
    /// Arbitrary page given as `query`: plain img-tag scan.
    Page,
    /// Bilibili search: bvid markers, external downloader.
    Videos,
}

/// One unit of batch work. Comes from CLI flags or the YAML batch file
/// and is never mutated by the pipeline.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchTask {
    /// Search terms, or the page url itself for `kind: page`.
    pub query: String,

    #[serde(default)]
    pub kind: TaskKind,

    pub out_dir: PathBuf,

    /// Stop after this many successful downloads. None means everything
    /// the page yields.
    #[serde(default)]
    pub max_assets: Option<usize>,

    /// Fixed pause between downloads. Manual rate limiting, not
    /// backpressure.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: f64,

    #[serde(default = "default_mode")]
    pub mode: FetchMode,

    /// How many result pages to walk (videos only).
    #[serde(default = "default_pages")]
    pub pages: u32,
}

fn default_delay_secs() -> f64 {
    DEFAULT_DELAY_SECS
}

fn default_mode() -> FetchMode {
    FetchMode::Static
}

fn default_pages() -> u32 {
    1
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TaskReport {
    /// Distinct asset urls / ids discovered.
    pub found: usize,
    /// Newly written files (or successful you-get runs).
    pub downloaded: usize,
    /// Assets that were already on disk.
    pub skipped: usize,
    /// Items that errored and were passed over.
    pub failed: usize,
}

pub fn image_search_url(query: &str) -> Result<String, FetchError> {
    url::Url::parse_with_params(IMAGE_SEARCH_BASE, &[("q", query)])
        .map(|u| u.to_string())
        .map_err(|e| FetchError::InvalidUrl(IMAGE_SEARCH_BASE.to_string(), e))
}

pub fn video_search_url(query: &str, page: u32) -> Result<String, FetchError> {
    url::Url::parse_with_params(
        VIDEO_SEARCH_BASE,
        &[("keyword", query), ("page", &page.to_string())],
    )
    .map(|u| u.to_string())
    .map_err(|e| FetchError::InvalidUrl(VIDEO_SEARCH_BASE.to_string(), e))
}

enum ItemOutcome {
    Saved,
    Skipped,
    Failed,
}

/// Download one asset. Failures never escape this boundary: every error
/// is logged and the loop moves on.
fn download_one(source: &dyn Source, url: &str, referer: &str, task: &SearchTask) -> ItemOutcome {
    let bytes = match source.fetch_asset(url, referer) {
        Ok(b) => b,
        Err(err) => {
            log::warn!("{url}: download failed: {err}");
            return ItemOutcome::Failed;
        }
    };

    match download::save_bytes(&task.out_dir, url, &bytes) {
        Ok(outcome) if outcome.already_existed => ItemOutcome::Skipped,
        Ok(_) => ItemOutcome::Saved,
        Err(err) => {
            log::warn!("{url}: could not persist: {err}");
            ItemOutcome::Failed
        }
    }
}

fn pause(task: &SearchTask) {
    let wait = fetch::wait_duration(task.delay_secs);
    if !wait.is_zero() {
        sleep(wait);
    }
}

fn cap_reached(report: &TaskReport, task: &SearchTask) -> bool {
    match task.max_assets {
        Some(max) => report.downloaded + report.skipped >= max,
        None => false,
    }
}

/// Run one task end to end. A failed page fetch aborts the task (the
/// caller logs it and moves on to the next task); per-item failures are
/// tallied and skipped.
pub fn run_task(
    source: &dyn Source,
    sink: &dyn VideoSink,
    task: &SearchTask,
) -> Result<TaskReport, FetchError> {
    match task.kind {
        TaskKind::Images => run_image_task(source, task),
        TaskKind::Page => run_page_task(source, task),
        TaskKind::Videos => run_video_task(source, sink, task),
    }
}

fn run_image_task(source: &dyn Source, task: &SearchTask) -> Result<TaskReport, FetchError> {
    let page_url = image_search_url(&task.query)?;
    let fetched = source.fetch_page(&page_url, &task.mode, Some(IMAGE_REFERER))?;
    let urls = extract::extract_image_urls(&fetched.html, &fetched.source_url);

    log::info!("{:?}: found {} image urls", task.query, urls.len());

    Ok(download_all(source, task, &urls, |_| IMAGE_REFERER.to_string()))
}

fn run_page_task(source: &dyn Source, task: &SearchTask) -> Result<TaskReport, FetchError> {
    let fetched = source.fetch_page(&task.query, &task.mode, None)?;
    let urls = extract::extract_img_tags(&fetched.html, &fetched.source_url);

    log::info!("{:?}: found {} image urls", task.query, urls.len());

    // arbitrary hosts expect the asset itself as referer
    Ok(download_all(source, task, &urls, |url| url.to_string()))
}

fn download_all(
    source: &dyn Source,
    task: &SearchTask,
    urls: &BTreeSet<String>,
    referer_for: impl Fn(&str) -> String,
) -> TaskReport {
    let mut report = TaskReport {
        found: urls.len(),
        ..Default::default()
    };

    for url in urls {
        if cap_reached(&report, task) {
            log::info!("reached max of {:?}, stopping", task.max_assets);
            break;
        }

        match download_one(source, url, &referer_for(url), task) {
            ItemOutcome::Saved => report.downloaded += 1,
            ItemOutcome::Skipped => report.skipped += 1,
            ItemOutcome::Failed => report.failed += 1,
        }

        pause(task);
    }

    report
}

fn run_video_task(
    source: &dyn Source,
    sink: &dyn VideoSink,
    task: &SearchTask,
) -> Result<TaskReport, FetchError> {
    // accumulate ids across the page range first; the same video showing
    // up on several pages collapses to one entry
    let mut ids: BTreeSet<String> = BTreeSet::new();
    for page in 1..=task.pages {
        let page_url = video_search_url(&task.query, page)?;
        match source.fetch_page(&page_url, &task.mode, Some(VIDEO_REFERER)) {
            Ok(fetched) => {
                let found = extract::extract_video_ids(&fetched.html);
                log::info!("{:?} page {page}: {} ids", task.query, found.len());
                ids.extend(found);
            }
            Err(err) => {
                log::warn!("{:?} page {page}: fetch failed: {err}", task.query);
            }
        }
    }

    let mut report = TaskReport {
        found: ids.len(),
        ..Default::default()
    };

    if let Err(err) = download::ensure_dir(&task.out_dir) {
        log::error!("cannot create {}: {err}", task.out_dir.display());
        return Ok(report);
    }

    for id in &ids {
        if cap_reached(&report, task) {
            log::info!("reached max of {:?}, stopping", task.max_assets);
            break;
        }

        let url = videos::video_url(id);
        match sink.download(&url, &task.out_dir) {
            Ok(()) => report.downloaded += 1,
            Err(err) => {
                log::warn!("{url}: {err}");
                report.failed += 1;
            }
        }

        pause(task);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_search_url_encodes_query() {
        let url = image_search_url("测试").unwrap();
        assert_eq!(
            url,
            "https://cn.bing.com/images/search?q=%E6%B5%8B%E8%AF%95"
        );
    }

    #[test]
    fn test_video_search_url_carries_page() {
        let url = video_search_url("黄果树瀑布", 3).unwrap();
        assert!(url.starts_with("https://search.bilibili.com/all?keyword="));
        assert!(url.ends_with("&page=3"));
    }

    #[test]
    fn test_task_yaml_defaults() {
        let task: SearchTask = serde_yml::from_str(
            r#"
            query: waterfalls
            out_dir: ./downloads/waterfalls
            "#,
        )
        .unwrap();

        assert_eq!(task.kind, TaskKind::Images);
        assert_eq!(task.max_assets, None);
        assert_eq!(task.delay_secs, 0.5);
        assert_eq!(task.mode, FetchMode::Static);
        assert_eq!(task.pages, 1);
    }
}
