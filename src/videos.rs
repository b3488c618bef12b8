use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::errors::SubprocessError;

const YOU_GET_BIN: &str = "you-get";
const VIDEO_URL_BASE: &str = "https://www.bilibili.com/video/";

/// Compose the playable url from an opaque per-item id.
pub fn video_url(bvid: &str) -> String {
    format!("{VIDEO_URL_BASE}{bvid}")
}

/// Hands a video url to whatever actually downloads it. Production
/// shells out to you-get; tests record the calls.
pub trait VideoSink {
    fn download(&self, url: &str, dest: &Path) -> Result<(), SubprocessError>;
}

/// Invokes the external `you-get` tool per video. We deliberately do
/// not reimplement the stream negotiation it does; the contract is its
/// exit status.
pub struct YouGet {
    pub cookies: PathBuf,
}

impl VideoSink for YouGet {
    fn download(&self, url: &str, dest: &Path) -> Result<(), SubprocessError> {
        log::info!("you-get {url} -> {}", dest.display());

        let status = Command::new(YOU_GET_BIN)
            .arg("--cookies")
            .arg(&self.cookies)
            .arg("-o")
            .arg(dest)
            .arg("-f")
            .arg(url)
            .status()
            .map_err(|source| SubprocessError::Spawn {
                command: YOU_GET_BIN.to_string(),
                source,
            })?;

        if !status.success() {
            return Err(SubprocessError::Failed {
                command: YOU_GET_BIN.to_string(),
                status,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_url_composition() {
        assert_eq!(
            video_url("BV1xx411c7mD"),
            "https://www.bilibili.com/video/BV1xx411c7mD"
        );
    }
}
