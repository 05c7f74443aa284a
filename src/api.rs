//! Read-side wrappers over the MediaWiki Action API.
//!
//! Each wrapper keeps the network call thin and delegates response handling
//! to a pure extractor over the JSON value, so the response shapes can be
//! tested without the network. A missing or empty response field means
//! "no data", not an error; only an explicit `error` object on the paginated
//! backlink query is surfaced, since a silently empty batch there would
//! corrupt the ranking.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use mediawiki::{api::Api, media_wiki_error::MediaWikiError};
use serde_json::Value;
use tokio::time::sleep;

/// Fixed delay between outbound requests, to respect the rate budget.
pub const REQUEST_SLEEP: Duration = Duration::from_millis(120);

#[derive(Debug)]
pub enum ApiError {
    Client(MediaWikiError),
    Server(Value),
}

impl std::error::Error for ApiError {}

impl From<MediaWikiError> for ApiError {
    fn from(e: MediaWikiError) -> Self {
        Self::Client(e)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(e) => e.fmt(f),
            Self::Server(e) => e.fmt(f),
        }
    }
}

fn detect_api_failure(v: &Value) -> Result<(), ApiError> {
    if v["error"].as_object().is_some() {
        return Err(ApiError::Server(v["error"].clone()));
    }
    Ok(())
}

/// Fetches the set of section anchors the wiki engine generates for a page,
/// following redirects.
pub async fn page_section_anchors(api: &Api, title: &str) -> Result<HashSet<String>, ApiError> {
    let params = api.params_into(&[
        ("action", "parse"),
        ("page", title),
        ("prop", "sections"),
        ("redirects", "1"),
        ("formatversion", "2"),
    ]);
    let res = api.get_query_api_json(&params).await?;
    Ok(section_anchors_from(&res))
}

/// Fetches the rendered HTML of a page, following redirects. A page without
/// parseable content yields an empty string.
pub async fn page_html(api: &Api, title: &str) -> Result<String, ApiError> {
    let params = api.params_into(&[
        ("action", "parse"),
        ("page", title),
        ("prop", "text"),
        ("redirects", "1"),
        ("formatversion", "2"),
    ]);
    let res = api.get_query_api_json(&params).await?;
    Ok(rendered_html_from(&res))
}

/// Fetches the raw wikitext of a page's latest revision, main slot,
/// following redirects.
pub async fn page_wikitext(api: &Api, title: &str) -> Result<String, ApiError> {
    let params = api.params_into(&[
        ("action", "query"),
        ("titles", title),
        ("prop", "revisions"),
        ("rvprop", "content"),
        ("rvslots", "main"),
        ("redirects", "1"),
        ("formatversion", "2"),
    ]);
    let res = api.get_query_api_json(&params).await?;
    Ok(revision_content_from(&res))
}

/// Counts non-redirect backlinks to a page within one namespace, following
/// continuation tokens. Counting stops once `cap` pages have been seen.
pub async fn count_backlinks(
    api: &Api,
    title: &str,
    namespace: i64,
    cap: usize,
) -> Result<usize, ApiError> {
    let ns = namespace.to_string();
    let mut total = 0usize;
    let mut cont: HashMap<String, String> = HashMap::new();
    loop {
        let mut params = api.params_into(&[
            ("action", "query"),
            ("list", "backlinks"),
            ("bltitle", title),
            ("blnamespace", ns.as_str()),
            ("blfilterredir", "nonredirects"),
            ("bllimit", "max"),
            ("formatversion", "2"),
        ]);
        params.extend(cont.clone());
        let res = api.get_query_api_json(&params).await?;
        detect_api_failure(&res)?;
        total += backlink_batch_len(&res);
        if total >= cap {
            return Ok(total);
        }
        match continue_params(&res) {
            Some(next) => cont = next,
            None => return Ok(total),
        }
        sleep(REQUEST_SLEEP).await;
    }
}

fn section_anchors_from(res: &Value) -> HashSet<String> {
    res["parse"]["sections"]
        .as_array()
        .map(|sections| {
            sections
                .iter()
                .filter_map(|s| s["anchor"].as_str())
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn rendered_html_from(res: &Value) -> String {
    res["parse"]["text"].as_str().unwrap_or("").to_string()
}

fn revision_content_from(res: &Value) -> String {
    res["query"]["pages"][0]["revisions"][0]["slots"]["main"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string()
}

fn backlink_batch_len(res: &Value) -> usize {
    res["query"]["backlinks"].as_array().map(Vec::len).unwrap_or(0)
}

fn continue_params(res: &Value) -> Option<HashMap<String, String>> {
    let cont = res["continue"].as_object()?;
    Some(
        cont.iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_section_anchors_from() {
        let res = json!({
            "parse": {
                "title": "تست",
                "sections": [
                    { "line": "تاریخچه", "anchor": "تاریخچه" },
                    { "line": "منابع", "anchor": "منابع" },
                    { "line": "بی‌لنگر", "anchor": "" }
                ]
            }
        });
        let anchors = section_anchors_from(&res);
        assert_eq!(anchors.len(), 2);
        assert!(anchors.contains("تاریخچه"));
        assert!(anchors.contains("منابع"));

        // missing page: no parse object at all
        assert!(section_anchors_from(&json!({ "error": { "code": "missingtitle" } })).is_empty());
    }

    #[test]
    fn test_rendered_html_from() {
        let res = json!({ "parse": { "text": "<div id=\"x\">body</div>" } });
        assert_eq!(rendered_html_from(&res), "<div id=\"x\">body</div>");
        assert_eq!(rendered_html_from(&json!({})), "");
    }

    #[test]
    fn test_revision_content_from() {
        let res = json!({
            "query": {
                "pages": [
                    {
                        "title": "تست",
                        "revisions": [
                            { "slots": { "main": { "content": "{{جعبه|نام=تست}}" } } }
                        ]
                    }
                ]
            }
        });
        assert_eq!(revision_content_from(&res), "{{جعبه|نام=تست}}");
        assert_eq!(revision_content_from(&json!({ "query": { "pages": [] } })), "");
        assert_eq!(revision_content_from(&json!({})), "");
    }

    #[test]
    fn test_backlink_batch_and_continue() {
        let res = json!({
            "continue": { "blcontinue": "0|12345", "continue": "-||" },
            "query": {
                "backlinks": [
                    { "pageid": 1, "ns": 0, "title": "الف" },
                    { "pageid": 2, "ns": 0, "title": "ب" }
                ]
            }
        });
        assert_eq!(backlink_batch_len(&res), 2);
        let cont = continue_params(&res).unwrap();
        assert_eq!(cont.get("blcontinue").map(String::as_str), Some("0|12345"));
        assert_eq!(cont.get("continue").map(String::as_str), Some("-||"));

        let done = json!({ "query": { "backlinks": [] } });
        assert_eq!(backlink_batch_len(&done), 0);
        assert!(continue_params(&done).is_none());
    }

    #[test]
    fn test_detect_api_failure() {
        assert!(detect_api_failure(&json!({ "query": {} })).is_ok());
        let res = json!({ "error": { "code": "maxlag", "info": "lagged" } });
        assert!(matches!(detect_api_failure(&res), Err(ApiError::Server(_))));
    }
}
