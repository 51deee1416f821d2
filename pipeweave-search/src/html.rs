//! Marker-based extraction of DuckDuckGo HTML results.
//!
//! The HTML endpoint has no API contract, so this sticks to the two
//! stable class markers (`result__a` for the title anchor,
//! `result__snippet` for the blurb) and plain string scanning.

use crate::SearchHit;

const TITLE_MARKER: &str = "class=\"result__a\"";
const SNIPPET_MARKER: &str = "class=\"result__snippet\"";

pub(crate) fn parse_results(html: &str, max_results: usize) -> Vec<SearchHit> {
    let title_positions: Vec<usize> = html.match_indices(TITLE_MARKER).map(|(i, _)| i).collect();
    let snippet_positions: Vec<usize> =
        html.match_indices(SNIPPET_MARKER).map(|(i, _)| i).collect();

    let mut hits = Vec::new();
    for (i, &pos) in title_positions.iter().enumerate() {
        if hits.len() >= max_results {
            break;
        }

        let url = href_before(&html[..pos]).map(clean_redirect_url).unwrap_or_default();
        let title = strip_tags(&tag_text(&html[pos + TITLE_MARKER.len()..], "</a>"));
        let snippet = snippet_positions
            .get(i)
            .map(|&spos| strip_tags(&snippet_text(&html[spos + SNIPPET_MARKER.len()..])))
            .unwrap_or_default();

        if !title.is_empty() || !url.is_empty() {
            hits.push(SearchHit {
                title,
                url,
                snippet: snippet.trim().to_string(),
            });
        }
    }
    hits
}

/// Value of the last `href="..."` attribute before the marker.
fn href_before(html: &str) -> Option<String> {
    let start = html.rfind("href=\"")? + "href=\"".len();
    let end = html[start..].find('"')?;
    Some(html[start..start + end].to_string())
}

/// Text between the marker's closing `>` and the given end tag.
fn tag_text(html: &str, end_tag: &str) -> String {
    let Some(open) = html.find('>') else {
        return String::new();
    };
    let content = &html[open + 1..];
    let end = content.find(end_tag).unwrap_or(content.len());
    content[..end].to_string()
}

/// Snippet body up to its own closing tag. The marker appears on either
/// an `<a>` or a `<span>`, and the body may contain inline tags such as
/// `<b>`, so stop at whichever closing tag comes first.
fn snippet_text(html: &str) -> String {
    let Some(open) = html.find('>') else {
        return String::new();
    };
    let content = &html[open + 1..];
    let end = ["</a>", "</span>", "</div>"]
        .iter()
        .filter_map(|tag| content.find(tag))
        .min()
        .unwrap_or(content.len());
    content[..end].to_string()
}

/// Resolve DuckDuckGo redirect links to their destination URL.
pub(crate) fn clean_redirect_url(url: String) -> String {
    if url.contains("duckduckgo.com/l/") {
        if let Some(start) = url.find("uddg=") {
            let encoded = url[start + "uddg=".len()..]
                .split('&')
                .next()
                .unwrap_or_default();
            return percent_decode(encoded);
        }
    }
    if let Some(rest) = url.strip_prefix("//") {
        return format!("https://{rest}");
    }
    url
}

pub(crate) fn percent_decode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '%' => {
                let hex: String = chars.by_ref().take(2).collect();
                match u8::from_str_radix(&hex, 16) {
                    Ok(byte) => out.push(byte as char),
                    Err(_) => {
                        out.push('%');
                        out.push_str(&hex);
                    }
                }
            }
            '+' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

/// Drop tags and decode the handful of entities DDG emits.
pub(crate) fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
}
