use clap::Parser;

mod cli;
mod config;
mod download;
mod errors;
mod extract;
mod fetch;
mod source;
mod task;
mod videos;

use cli::{DownloadArgs, RenderArgs};
use config::Config;
use fetch::FetchMode;
use source::HttpSource;
use task::{SearchTask, TaskKind};
use videos::YouGet;

fn fetch_mode(render: &RenderArgs) -> FetchMode {
    if render.rendered {
        FetchMode::Rendered {
            scroll_times: render.scroll_times,
            scroll_wait_secs: render.scroll_wait,
        }
    } else {
        FetchMode::Static
    }
}

fn single_task(query: String, kind: TaskKind, download: DownloadArgs, mode: FetchMode, pages: u32) -> SearchTask {
    SearchTask {
        query,
        kind,
        out_dir: download.out,
        max_assets: download.max,
        delay_secs: download.delay,
        mode,
        pages,
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let mut config = Config::default();
    let tasks = match args.command {
        cli::Command::Images {
            query,
            download,
            render,
        } => {
            let mode = fetch_mode(&render);
            vec![single_task(query, TaskKind::Images, download, mode, 1)]
        }

        cli::Command::Page {
            url,
            download,
            render,
        } => {
            let mode = fetch_mode(&render);
            vec![single_task(url, TaskKind::Page, download, mode, 1)]
        }

        cli::Command::Videos {
            query,
            pages,
            cookies,
            download,
        } => {
            config.cookies = cookies;
            vec![single_task(
                query,
                TaskKind::Videos,
                download,
                FetchMode::Static,
                pages,
            )]
        }

        cli::Command::Batch { config: path } => {
            config = Config::load(&path)?;
            std::mem::take(&mut config.tasks)
        }
    };

    let source = HttpSource::new(&config.user_agent);
    let sink = YouGet {
        cookies: config.cookies.clone(),
    };

    // a task failing wholesale must not stop the rest of the batch
    for task in &tasks {
        match task::run_task(&source, &sink, task) {
            Ok(report) => {
                log::info!(
                    "{:?}: {} found, {} downloaded, {} already present, {} failed",
                    task.query,
                    report.found,
                    report.downloaded,
                    report.skipped,
                    report.failed
                );
                println!("{}", serde_json::to_string_pretty(&report).unwrap());
            }
            Err(err) => {
                log::error!("task {:?} failed: {err}", task.query);
            }
        }
    }

    Ok(())
}
