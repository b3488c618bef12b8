use crate::{
    errors::{DownloadError, FetchError},
    fetch::{self, FetchMode, FetchResult},
};

/// Where pages and asset bodies come from. The orchestrator only talks
/// to this seam, so tests can run the whole pipeline against a stub.
pub trait Source {
    fn fetch_page(
        &self,
        url: &str,
        mode: &FetchMode,
        referer: Option<&str>,
    ) -> Result<FetchResult, FetchError>;

    fn fetch_asset(&self, url: &str, referer: &str) -> Result<Vec<u8>, DownloadError>;
}

/// Production source: blocking HTTP, plus headless chrome for rendered
/// pages when the feature is compiled in.
pub struct HttpSource {
    user_agent: String,
}

impl HttpSource {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

impl Default for HttpSource {
    fn default() -> Self {
        Self::new(fetch::USER_AGENT_DEFAULT)
    }
}

impl Source for HttpSource {
    fn fetch_page(
        &self,
        url: &str,
        mode: &FetchMode,
        referer: Option<&str>,
    ) -> Result<FetchResult, FetchError> {
        fetch::fetch_page(url, mode, referer, &self.user_agent)
    }

    fn fetch_asset(&self, url: &str, referer: &str) -> Result<Vec<u8>, DownloadError> {
        fetch::fetch_asset(url, referer, &self.user_agent)
    }
}
