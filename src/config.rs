use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::{
    fetch::{self, FetchMode},
    task::SearchTask,
};

const DEFAULT_COOKIES_FILE: &str = "cookies.txt";

/// Batch configuration: a list of tasks plus a couple of global knobs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Cookie jar handed to you-get for video downloads.
    #[serde(default = "default_cookies")]
    pub cookies: PathBuf,

    #[serde(default)]
    pub tasks: Vec<SearchTask>,
}

fn default_user_agent() -> String {
    fetch::USER_AGENT_DEFAULT.to_string()
}

fn default_cookies() -> PathBuf {
    PathBuf::from(DEFAULT_COOKIES_FILE)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            cookies: default_cookies(),
            tasks: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;

        let config: Self = serde_yml::from_str(&config_str)
            .with_context(|| format!("{} is malformed", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (idx, task) in self.tasks.iter().enumerate() {
            let idx = idx + 1;

            if task.query.trim().is_empty() {
                bail!("task #{idx} has an empty query");
            }
            if task.delay_secs < 0.0 {
                bail!("task #{idx}: delay_secs must not be negative");
            }
            if task.pages == 0 {
                bail!("task #{idx}: pages must be at least 1");
            }

            if let FetchMode::Rendered {
                scroll_wait_secs, ..
            } = &task.mode
            {
                if !scroll_wait_secs.is_finite() || *scroll_wait_secs < 0.0 {
                    bail!("task #{idx}: scroll_wait_secs must be a non-negative number");
                }
            }
        }

        Ok(())
    }
}
