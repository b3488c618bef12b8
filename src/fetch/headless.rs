use headless_chrome::{protocol::cdp::Target::CreateTarget, LaunchOptionsBuilder};
use std::{path::PathBuf, str::FromStr, thread::sleep, time::Duration};

use crate::errors::FetchError;

const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight);";

fn chrome_err(context: &str, err: impl std::fmt::Display) -> FetchError {
    FetchError::Headless(format!("{context}: {err}"))
}

/// Fetch a page through a headless Chrome session, scrolling to the
/// bottom `scroll_times` times with `scroll_wait_secs` between scrolls
/// so that lazily loaded content gets a chance to appear. There is no
/// detection of "no more content": all scroll cycles always run.
///
/// The browser process is owned by this function and torn down when
/// `browser` drops, on the error paths as well as on success.
pub fn fetch_rendered(url: &str, scroll_times: u32, scroll_wait_secs: f64) -> Result<String, FetchError> {
    let browser = headless_chrome::Browser::new(
        LaunchOptionsBuilder::default()
            .sandbox(false)
            .path(
                std::env::var("CHROME_PATH")
                    .ok()
                    .map(|p| PathBuf::from_str(&p).unwrap()),
            )
            .build()
            .map_err(|e| chrome_err("bad launch options", e))?,
    )
    .map_err(|e| chrome_err("could not launch chromium", e))?;

    let tab = browser
        .new_tab_with_options(CreateTarget {
            for_tab: None,
            url: url.to_string(),
            width: Some(1280),
            height: Some(720),
            browser_context_id: None,
            enable_begin_frame_control: None,
            new_window: Some(true),
            background: None,
        })
        .map_err(|e| chrome_err("could not open tab", e))?;

    tab.set_default_timeout(Duration::from_secs(15));

    tab.navigate_to(url)
        .map_err(|e| chrome_err(url, e))?;
    tab.wait_until_navigated()
        .map_err(|e| chrome_err(url, e))?;

    log::info!("loading {url} in headless chrome");

    let wait = super::wait_duration(scroll_wait_secs);
    for i in 0..scroll_times {
        log::debug!("{url}: scroll {}/{scroll_times}", i + 1);
        tab.evaluate(SCROLL_TO_BOTTOM, false)
            .map_err(|e| chrome_err("scroll failed", e))?;
        sleep(wait);
    }

    let html = tab
        .get_content()
        .map_err(|e| chrome_err("could not read page source", e))?;

    let _ = tab.close(true);

    Ok(html)
}
