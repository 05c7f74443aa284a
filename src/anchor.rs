//! Decides whether a URL fragment still identifies a reachable anchor on a
//! target page.
//!
//! Anchors can originate from three different rendering paths: engine-generated
//! section headers, hand-authored `id=`/`name=` attributes in the rendered
//! markup, and template parameters that produce anchors not visible in either
//! of the first two. The predicates here check one signal each; the caller
//! tries them in order of cost.

use std::collections::HashSet;

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;

lazy_static! {
    static ref RE_ID_ATTR: Regex =
        Regex::new(r#"\b(?:id|name)\s*=\s*(?:"([^"]+)"|'([^']+)')"#).unwrap();
    static ref RE_UNDERSCORE_RUN: Regex = Regex::new(r"_+").unwrap();
}

/// Tolerant percent-decoding. Input that does not decode to valid UTF-8 is
/// returned unchanged.
fn decode_percent(s: &str) -> String {
    match percent_decode_str(s).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => s.to_string(),
    }
}

/// Prepares a raw `rd_fragment` value for matching: one round of
/// percent-decoding plus whitespace trimming.
pub fn normalize_fragment(raw: &str) -> String {
    decode_percent(raw).trim().to_string()
}

/// Normalizes an anchor identifier into the canonical key form used by the
/// id index: percent-decoded, trimmed, spaces converted to underscores and
/// underscore runs collapsed.
pub fn normalize_anchor_key(s: &str) -> String {
    let decoded = decode_percent(s);
    let underscored = decoded.trim().replace(' ', "_");
    RE_UNDERSCORE_RUN.replace_all(&underscored, "_").into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn unescape_dot_hex_bytes(s: &str) -> Vec<u8> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'.' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

/// Reverses MediaWiki's id attribute escaping, where each escaped byte is
/// written as `.XX` with two hexadecimal digits. Other characters pass
/// through as their UTF-8 bytes. If the unescaped bytes are not valid UTF-8,
/// the input is returned unchanged.
pub fn unescape_dot_hex(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    match String::from_utf8(unescape_dot_hex_bytes(s)) {
        Ok(decoded) => decoded,
        Err(_) => s.to_string(),
    }
}

/// The fragment and its space/underscore variants, trimmed, empty ones
/// dropped.
fn fragment_variants(frag: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(3);
    for v in [
        frag.to_string(),
        frag.replace('_', " "),
        frag.replace(' ', "_"),
    ] {
        let v = v.trim().to_string();
        if !v.is_empty() && !out.contains(&v) {
            out.push(v);
        }
    }
    out
}

/// Checks the fragment against the section-anchor set, with spaces and
/// underscores interchanged. This is the authoritative signal since it
/// reflects how the wiki engine generates section anchors.
pub fn fragment_matches(frag: &str, anchors: &HashSet<String>) -> bool {
    anchors.contains(frag)
        || anchors.contains(&frag.replace(' ', "_"))
        || anchors.contains(&frag.replace('_', " "))
}

/// Collects every `id=` and `name=` attribute value from rendered page
/// markup, indexing both the raw value and its dot-hex-unescaped form under
/// the normalized key.
pub fn id_index_from_html(html: &str) -> HashSet<String> {
    let mut index = HashSet::new();
    if html.is_empty() {
        return index;
    }
    for cap in RE_ID_ATTR.captures_iter(html) {
        let raw = cap
            .get(1)
            .or_else(|| cap.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        if raw.is_empty() {
            continue;
        }
        index.insert(normalize_anchor_key(raw));
        index.insert(normalize_anchor_key(&unescape_dot_hex(raw)));
    }
    index
}

/// Checks the fragment, and its space/underscore variants, against an id
/// index built by [`id_index_from_html`].
pub fn fragment_in_id_index(frag: &str, index: &HashSet<String>) -> bool {
    if index.is_empty() {
        return false;
    }
    fragment_variants(frag)
        .iter()
        .any(|v| index.contains(&normalize_anchor_key(v)))
}

/// Searches raw wikitext for the fragment as the value of a template
/// parameter named نام, عنوان or title, terminated by a line break, pipe or
/// closing brace. This approximates anchors generated by infoboxes that show
/// up in neither the section list nor the id attributes.
pub fn fragment_in_wikitext(wikitext: &str, frag: &str) -> bool {
    if wikitext.is_empty() {
        return false;
    }
    for variant in fragment_variants(frag) {
        let pattern = format!(
            r"\|\s*(?:نام|عنوان|title)\s*=\s*{}\s*(?:\n|\r|\}}|\|)",
            regex::escape(&variant)
        );
        let matched = Regex::new(&pattern)
            .map(|re| re.is_match(wikitext))
            .unwrap_or(false);
        if matched {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dot_hex_round_trip_all_bytes() {
        for b in 0u8..=255 {
            assert_eq!(unescape_dot_hex_bytes(&format!(".{:02X}", b)), vec![b]);
            assert_eq!(unescape_dot_hex_bytes(&format!(".{:02x}", b)), vec![b]);
        }
    }

    #[test]
    fn test_unescape_dot_hex() {
        // "نام" as MediaWiki escapes it
        assert_eq!(unescape_dot_hex(".D9.86.D8.A7.D9.85"), "نام");
        assert_eq!(unescape_dot_hex("Foo.2C_bar"), "Foo,_bar");
        assert_eq!(unescape_dot_hex("plain"), "plain");
        // not a hex pair, dot passes through
        assert_eq!(unescape_dot_hex(".G1"), ".G1");
        assert_eq!(unescape_dot_hex("end."), "end.");
        // lone high byte is invalid UTF-8, input comes back unchanged
        assert_eq!(unescape_dot_hex(".FF"), ".FF");
        assert_eq!(unescape_dot_hex(""), "");
    }

    #[test]
    fn test_normalize_anchor_key() {
        assert_eq!(normalize_anchor_key("  A  B "), "A_B");
        assert_eq!(normalize_anchor_key("A___B"), "A_B");
        assert_eq!(normalize_anchor_key("%D9%86%D8%A7%D9%85"), "نام");
        assert_eq!(normalize_anchor_key("%FF broken"), "%FF_broken");
    }

    #[test]
    fn test_normalize_fragment() {
        assert_eq!(normalize_fragment(" Intro "), "Intro");
        assert_eq!(normalize_fragment("%D8%AA%D8%A7%D8%B1%DB%8C%D8%AE"), "تاریخ");
        assert_eq!(normalize_fragment(""), "");
    }

    #[test]
    fn test_fragment_matches_space_underscore_commutative() {
        let with_underscore: HashSet<String> = ["A_B".to_string()].into_iter().collect();
        let with_space: HashSet<String> = ["A B".to_string()].into_iter().collect();
        assert!(fragment_matches("A B", &with_underscore));
        assert!(fragment_matches("A_B", &with_underscore));
        assert!(fragment_matches("A B", &with_space));
        assert!(fragment_matches("A_B", &with_space));
        assert!(!fragment_matches("A C", &with_space));
    }

    #[test]
    fn test_id_index_from_html() {
        let html = concat!(
            r#"<span id="تاریخچه"></span>"#,
            r#"<a name='Foo_bar'></a>"#,
            r#"<h2 id=".D9.86.D8.A7.D9.85"></h2>"#,
            r#"<div id=""></div>"#,
        );
        let index = id_index_from_html(html);
        assert!(index.contains("تاریخچه"));
        assert!(index.contains("Foo_bar"));
        // both the raw escaped value and the unescaped one are indexed
        assert!(index.contains(".D9.86.D8.A7.D9.85"));
        assert!(index.contains("نام"));
        assert!(id_index_from_html("").is_empty());
    }

    #[test]
    fn test_fragment_in_id_index() {
        let index = id_index_from_html(r#"<span id="Foo_bar"></span>"#);
        assert!(fragment_in_id_index("Foo bar", &index));
        assert!(fragment_in_id_index("Foo_bar", &index));
        assert!(!fragment_in_id_index("Baz", &index));
        assert!(!fragment_in_id_index("Foo bar", &HashSet::new()));
    }

    #[test]
    fn test_fragment_in_wikitext() {
        let wikitext = "{{جعبه\n| نام = تست الف\n|عنوان=Heading}}\n| title = Third |";
        assert!(fragment_in_wikitext(wikitext, "تست الف"));
        // underscore variant of a space-separated parameter value
        assert!(fragment_in_wikitext(wikitext, "تست_الف"));
        assert!(fragment_in_wikitext(wikitext, "Heading"));
        assert!(fragment_in_wikitext(wikitext, "Third"));
        assert!(!fragment_in_wikitext(wikitext, "تست"));
        assert!(!fragment_in_wikitext(wikitext, "Elsewhere"));
        assert!(!fragment_in_wikitext("", "تست الف"));
    }
}
