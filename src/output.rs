//! Publishing to wiki pages.

use std::collections::HashMap;

use md5::{Md5, Digest};
use mediawiki::api::Api;

#[derive(Debug)]
pub enum EditPageError {
    MediaWiki(mediawiki::media_wiki_error::MediaWikiError),
    EditError(String, String),
}

impl std::error::Error for EditPageError {}

impl std::fmt::Display for EditPageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditPageError::MediaWiki(e) => e.fmt(f),
            EditPageError::EditError(code, info) => f.write_fmt(format_args!("MediaWiki API returns error code: \"{}\", more info: \"{}\"", code, info)),
        }
    }
}

impl From<mediawiki::media_wiki_error::MediaWikiError> for EditPageError {
    fn from(e: mediawiki::media_wiki_error::MediaWikiError) -> Self {
        Self::MediaWiki(e)
    }
}

/// Replaces the full text of the page with the given text, using the given
/// edit summary. The md5 parameter guards against truncated transfers.
///
/// Report pages are created on first run, so the edit does not pass
/// `nocreate`.
pub async fn write_page(api: &mut Api, title: &str, text: impl Into<String>, summary: impl Into<String>, minor: bool) -> Result<(), EditPageError> {
    let text_string = text.into();
    let mut hasher = Md5::new();
    hasher.update(&text_string);
    let result = hasher.finalize();
    let md5 = hex::encode(result);
    let mut params: HashMap<String, String> = [
        ("action", "edit"),
        ("title", title),
        ("text", &text_string),
        ("summary", &summary.into()),
        ("utf8", "1"),
        ("md5", &md5),
        ("bot", "1"),
        ("token", &api.get_edit_token().await?),
    ]
    .iter()
    .map(|&(k, v)| (k.to_string(), v.to_string()))
    .collect();

    if minor {
        params.insert("minor".to_string(), "1".to_string());
    }

    let result = api.post_query_api_json(&params).await?;
    match result["edit"]["result"].as_str() {
        Some("Success") => Ok(()),
        _ => {
            let ecode = result["error"]["code"].as_str().unwrap_or("<unknown>");
            let einfo = result["error"]["info"].as_str().unwrap_or("<unknown>");
            Err(EditPageError::EditError(String::from(ecode), String::from(einfo)))
        },
    }
}
