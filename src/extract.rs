use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Bing embeds the original image url as a JSON field in inline script
/// blobs: `"murl":"https://..."`. Matching the raw text is enough, no
/// structured parse of the embedded JSON is needed.
static MURL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""murl":"(https://[^"]+)""#).unwrap());

/// Bilibili search results carry per-video ids as `bvid:"BV..."`.
static BVID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"bvid:"([A-Za-z0-9]+)""#).unwrap());

/// Thumbnail host; fallback scanning must not pick thumbnails up.
const THUMB_HOST: &str = "th.bing.com";

fn unescape_url(url: &str) -> String {
    url.replace("\\u0026", "&")
}

/// Extract original-image urls from a fetched page.
///
/// Primary strategy is the `murl` marker scan. Only when it yields
/// nothing do we fall back to scanning `<img>` tags for lazy-load or
/// plain source attributes. The result is a set: the same url appearing
/// several times in the page collapses to one entry.
pub fn extract_image_urls(html: &str, base_url: &str) -> BTreeSet<String> {
    let mut urls: BTreeSet<String> = MURL_RE
        .captures_iter(html)
        .map(|cap| unescape_url(&cap[1]))
        .collect();

    if urls.is_empty() {
        log::debug!("no murl markers found, scanning img tags");
        urls = extract_img_tags(html, base_url);
    }

    urls
}

/// Scan `<img>` elements for a usable source attribute, preferring the
/// lazy-load attribute over the plain one. Relative urls are resolved
/// against the page url; `data:` uris and thumbnail-host urls are
/// dropped.
pub fn extract_img_tags(html: &str, base_url: &str) -> BTreeSet<String> {
    let document = scraper::Html::parse_document(html);
    let img_selector = scraper::Selector::parse("img").unwrap();

    let base = url::Url::parse(base_url).ok();

    let mut urls = BTreeSet::new();
    for element in document.select(&img_selector) {
        let src = element
            .attr("data-src")
            .or_else(|| element.attr("src"))
            .or_else(|| element.attr("data-lazy-src"))
            .unwrap_or_default();

        if src.is_empty() || src.starts_with("data:") {
            continue;
        }

        let absolute = if src.starts_with("http") {
            src.to_string()
        } else if let Some(joined) = base.as_ref().and_then(|b| b.join(src).ok()) {
            joined.to_string()
        } else {
            continue;
        };

        if !absolute.starts_with("http") || absolute.contains(THUMB_HOST) {
            continue;
        }

        urls.insert(absolute);
    }

    urls
}

/// Extract deduplicated video ids (`bvid`) from a search results page.
/// The ids are opaque; the caller composes the playable url from them.
pub fn extract_video_ids(html: &str) -> BTreeSet<String> {
    if !html.contains("bilibili") {
        return BTreeSet::new();
    }

    BVID_RE
        .captures_iter(html)
        .map(|cap| cap[1].to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murl_extraction_dedups_and_unescapes() {
        let html = r#"
            <script>{"murl":"https://example.com/a.jpg?x=1&y=2"}</script>
            <script>{"murl":"https://example.com/a.jpg?x=1&y=2"}</script>
            <script>{"murl":"https://example.com/b.png"}</script>
        "#;
        let urls = extract_image_urls(html, "https://cn.bing.com/images/search?q=x");
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://example.com/a.jpg?x=1&y=2"));
        assert!(urls.contains("https://example.com/b.png"));
    }

    #[test]
    fn test_murl_unescapes_encoded_ampersand() {
        // bing embeds & as \u0026 inside the inline JSON
        let html = r#""murl":"https://example.com/a.jpg?x=1\u0026y=2""#;
        let urls = extract_image_urls(html, "https://cn.bing.com");
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://example.com/a.jpg?x=1&y=2"));
    }

    #[test]
    fn test_murl_requires_https() {
        let html = r#""murl":"http://insecure.example.com/a.jpg""#;
        let urls = extract_image_urls(html, "https://cn.bing.com");
        assert!(urls.is_empty());
    }

    #[test]
    fn test_fallback_runs_when_no_markers() {
        let html = r#"
            <html><body>
                <img data-src="https://example.com/full.jpg">
                <img src="https://th.bing.com/th/id/thumb.jpg">
                <img src="data:image/png;base64,AAAA">
                <img src="/relative/pic.png">
            </body></html>
        "#;
        let urls = extract_image_urls(html, "https://host.example.com/page");
        assert_eq!(urls.len(), 2);
        assert!(urls.contains("https://example.com/full.jpg"));
        assert!(urls.contains("https://host.example.com/relative/pic.png"));
    }

    #[test]
    fn test_markers_win_over_img_tags() {
        let html = r#"
            <script>{"murl":"https://example.com/original.jpg"}</script>
            <img src="https://example.com/inline.jpg">
        "#;
        let urls = extract_image_urls(html, "https://cn.bing.com");
        assert_eq!(urls.len(), 1);
        assert!(urls.contains("https://example.com/original.jpg"));
    }

    #[test]
    fn test_empty_input_gives_empty_set() {
        let urls = extract_image_urls("<html><body>nothing here</body></html>", "https://x.example");
        assert!(urls.is_empty());
    }

    #[test]
    fn test_bvid_extraction_dedups() {
        let html = r#"
            bilibili search results
            {bvid:"BV1xx411c7mD",title:"a"}
            {bvid:"BV1xx411c7mD",title:"dup"}
            {bvid:"BV2yy522d8nE",title:"b"}
        "#;
        let ids = extract_video_ids(html);
        assert_eq!(ids.len(), 2);
        assert!(ids.contains("BV1xx411c7mD"));
        assert!(ids.contains("BV2yy522d8nE"));
    }

    #[test]
    fn test_bvid_requires_site_marker() {
        let html = r#"{bvid:"BV1xx411c7mD"}"#;
        assert!(extract_video_ids(html).is_empty());
    }
}
