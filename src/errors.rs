#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("request failed: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[cfg(feature = "headless")]
    #[error("headless browser failed: {0}")]
    Headless(String),

    #[cfg(not(feature = "headless"))]
    #[error("rendered mode requested but the headless feature is not compiled in")]
    HeadlessUnavailable,
}

#[derive(thiserror::Error, Debug)]
pub enum DownloadError {
    #[error("invalid url {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),

    #[error("request failed: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("unexpected status {status} for {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("io error: {0:?}")]
    IO(#[from] std::io::Error),
}

#[derive(thiserror::Error, Debug)]
pub enum SubprocessError {
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command:?} exited with {status}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
    },
}
