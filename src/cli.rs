use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(name = "imgrab", version, about = "Batch image/video search scraper")]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct DownloadArgs {
    /// Destination directory. Created if missing; files are named by
    /// content hash.
    #[clap(short, long)]
    pub out: PathBuf,

    /// Stop after this many successful downloads.
    #[clap(long)]
    pub max: Option<usize>,

    /// Pause between downloads, in seconds.
    #[clap(long, default_value = "0.5")]
    pub delay: f64,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RenderArgs {
    /// Load the page in a headless browser and scroll to trigger lazy
    /// loading, instead of a plain GET.
    #[clap(long, default_value = "false")]
    pub rendered: bool,

    /// Scroll-to-bottom cycles in rendered mode.
    #[clap(long, default_value = "16")]
    pub scroll_times: u32,

    /// Wait between scrolls, in seconds.
    #[clap(long, default_value = "0.5")]
    pub scroll_wait: f64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scrape original images from Bing image search.
    Images {
        /// Search terms.
        #[clap(short, long)]
        query: String,

        #[clap(flatten)]
        download: DownloadArgs,

        #[clap(flatten)]
        render: RenderArgs,
    },

    /// Download every image referenced by an arbitrary page.
    Page {
        /// Page url to scan for img tags.
        #[clap(short, long)]
        url: String,

        #[clap(flatten)]
        download: DownloadArgs,

        #[clap(flatten)]
        render: RenderArgs,
    },

    /// Collect video ids from Bilibili search and hand each one to
    /// you-get.
    Videos {
        /// Search terms.
        #[clap(short, long)]
        query: String,

        /// Result pages to walk.
        #[clap(long, default_value = "1")]
        pages: u32,

        /// Cookie jar passed to you-get.
        #[clap(long, default_value = "cookies.txt")]
        cookies: PathBuf,

        #[clap(flatten)]
        download: DownloadArgs,
    },

    /// Run every task from a YAML batch file.
    Batch {
        /// Path to the batch file.
        #[clap(short, long)]
        config: PathBuf,
    },
}
