#[cfg(feature = "headless")]
pub mod headless;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::errors::{DownloadError, FetchError};

pub const USER_AGENT_DEFAULT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";
const ACCEPT_DEFAULT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// How a listing page is retrieved.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// Single GET, no script execution.
    Static,
    /// Headless browser session that scrolls to the bottom
    /// `scroll_times` times to trigger lazy loading.
    Rendered {
        scroll_times: u32,
        scroll_wait_secs: f64,
    },
}

/// Raw HTML of one fetched page. Transient: discarded after extraction.
#[derive(Clone, Debug)]
pub struct FetchResult {
    pub source_url: String,
    pub html: String,
    pub fetched_at: u128,
}

/// Sleep interval from a caller-supplied seconds value. Negative and
/// non-finite values mean no wait; `Duration::from_secs_f64` would
/// panic on them.
pub fn wait_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}

pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis()
}

fn normalize_url(url: &str) -> String {
    // protocol-relative urls show up in scraped markup
    if url.starts_with("//") {
        format!("https:{url}")
    } else {
        url.to_string()
    }
}

fn http_client(user_agent: &str) -> Result<reqwest::blocking::Client, reqwest::Error> {
    reqwest::blocking::Client::builder()
        .user_agent(user_agent.to_string())
        .timeout(REQUEST_TIMEOUT)
        .pool_idle_timeout(REQUEST_TIMEOUT)
        .build()
}

/// Fetch a listing page. Non-2xx, network failures and timeouts are all
/// `FetchError`; there is no retry.
pub fn fetch_page(
    url: &str,
    mode: &FetchMode,
    referer: Option<&str>,
    user_agent: &str,
) -> Result<FetchResult, FetchError> {
    let html = match mode {
        FetchMode::Static => fetch_static(url, referer, user_agent)?,

        #[cfg(feature = "headless")]
        FetchMode::Rendered {
            scroll_times,
            scroll_wait_secs,
        } => headless::fetch_rendered(url, *scroll_times, *scroll_wait_secs)?,

        #[cfg(not(feature = "headless"))]
        FetchMode::Rendered { .. } => return Err(FetchError::HeadlessUnavailable),
    };

    Ok(FetchResult {
        source_url: url.to_string(),
        html,
        fetched_at: now_millis(),
    })
}

fn fetch_static(url: &str, referer: Option<&str>, user_agent: &str) -> Result<String, FetchError> {
    let url = normalize_url(url);

    let url_parsed = reqwest::Url::parse(&url)
        .map_err(|e| FetchError::InvalidUrl(url.clone(), e))?;
    let iden = format!(
        "{}{}",
        url_parsed.host_str().unwrap_or_default(),
        url_parsed.path()
    );

    log::debug!("{iden}: requesting");

    let mut request = http_client(user_agent)?
        .get(&url)
        .header(reqwest::header::ACCEPT, ACCEPT_DEFAULT);
    if let Some(referer) = referer {
        request = request.header(reqwest::header::REFERER, referer);
    }

    let resp = request.send()?;

    let status = resp.status();
    if !status.is_success() {
        log::debug!("{iden}: {:?}", status.to_string());
        return Err(FetchError::Status { url, status });
    }

    Ok(resp.text()?)
}

/// Fetch a single asset body. The Referer satisfies hot-link protection
/// on image hosts. Only a 200 yields bytes; anything else is an error
/// for the caller to log and skip.
pub fn fetch_asset(url: &str, referer: &str, user_agent: &str) -> Result<Vec<u8>, DownloadError> {
    let url = normalize_url(url);

    let url_parsed = reqwest::Url::parse(&url)
        .map_err(|e| DownloadError::InvalidUrl(url.clone(), e))?;
    let iden = format!(
        "{}{}",
        url_parsed.host_str().unwrap_or_default(),
        url_parsed.path()
    );

    log::debug!("{iden}: requesting asset");

    let resp = http_client(user_agent)?
        .get(&url)
        .header(reqwest::header::REFERER, referer)
        .send()?;

    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        log::debug!("{iden}: {:?}", status.to_string());
        return Err(DownloadError::Status { url, status });
    }

    let bytes = resp.bytes()?;
    Ok(bytes.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_protocol_relative() {
        assert_eq!(
            normalize_url("//img.example.com/a.jpg"),
            "https://img.example.com/a.jpg"
        );
        assert_eq!(
            normalize_url("https://img.example.com/a.jpg"),
            "https://img.example.com/a.jpg"
        );
    }

    #[test]
    fn test_wait_duration_clamps_invalid_input() {
        assert_eq!(wait_duration(0.5), Duration::from_millis(500));
        assert_eq!(wait_duration(0.0), Duration::ZERO);
        assert_eq!(wait_duration(-1.0), Duration::ZERO);
        assert_eq!(wait_duration(f64::NAN), Duration::ZERO);
        assert_eq!(wait_duration(f64::INFINITY), Duration::ZERO);
    }

    #[test]
    fn test_fetch_static_rejects_garbage_url() {
        let err = fetch_static("not a url", None, USER_AGENT_DEFAULT);
        assert!(matches!(err, Err(FetchError::InvalidUrl(..))));
    }

    #[test]
    fn test_fetch_asset_rejects_garbage_url() {
        let err = fetch_asset(":::", "https://example.com", USER_AGENT_DEFAULT);
        assert!(matches!(err, Err(DownloadError::InvalidUrl(..))));
    }
}
