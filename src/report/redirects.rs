//! Broken section-redirects report.
//!
//! A mainspace redirect with a fragment points at a section of its target
//! page. When that anchor no longer exists on the target, the redirect is
//! broken. This routine checks every candidate fragment against three
//! signals, cheapest first: the engine-reported section anchors, the id
//! attributes of the rendered markup, and infobox-style parameters in the
//! raw wikitext. Broken redirects are ranked by incoming-link count and the
//! top rows are published.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use mediawiki::api::Api;
use tokio::time::sleep;
use tracing::{event, Level};

use crate::{anchor, api, db, format, output};
use super::ReportError;

const REPORT_PAGE: &str = "ویکی‌پدیا:گزارش دیتابیس/تغییرمسیرهای از کار افتاده به بخش‌ها";
const SIGN_PAGE: &str = "ویکی‌پدیا:گزارش دیتابیس/تغییرمسیرهای از کار افتاده به بخش‌ها/امضا";

const REPORT_SUMMARY: &str = "به‌روزرسانی خودکار گزارش تغییرمسیرهای از کار افتاده به بخش‌ها";
const SIGN_SUMMARY: &str = "به‌روزرسانی امضای گزارش دیتابیس";

const MAX_ROWS: usize = 500;
const BACKLINKS_MAX_PAGES: usize = 20000;
const BACKLINKS_NAMESPACE: i64 = 0;

struct BrokenRedirect {
    redirect: String,
    target: String,
    fragment_display: String,
    incoming: usize,
}

pub async fn run(api: &mut Api) -> Result<(), ReportError> {
    let ts = format::to_persian_digits(
        &Utc::now().format("%H:%M، %Y-%m-%d (UTC)").to_string(),
    );

    let mut conn = db::connect(db::Replica::FaWiki).await?;
    let candidates = db::redirect_candidates(&mut conn, MAX_ROWS * 10).await?;
    conn.disconnect().await?;
    event!(Level::INFO, rows = candidates.len(), "candidate redirects fetched");

    // group by target so each target page is fetched at most once,
    // preserving source order
    let mut target_order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<db::RedirectCandidate>> = HashMap::new();
    for candidate in candidates {
        if !grouped.contains_key(&candidate.target) {
            target_order.push(candidate.target.clone());
        }
        grouped.entry(candidate.target.clone()).or_default().push(candidate);
    }

    let mut broken: Vec<BrokenRedirect> = Vec::new();
    let mut id_index_cache: HashMap<String, HashSet<String>> = HashMap::new();
    let mut wikitext_cache: HashMap<String, String> = HashMap::new();

    for target in target_order {
        let rows = grouped.remove(&target).unwrap_or_default();
        let anchors = api::page_section_anchors(api, &target).await?;
        sleep(api::REQUEST_SLEEP).await;

        // first pass against the authoritative section anchors; the other
        // two signals are only fetched when at least one row needs them
        let mut staged = Vec::with_capacity(rows.len());
        let mut need_extra = false;
        for candidate in rows {
            let frag = anchor::normalize_fragment(&candidate.fragment);
            let ok = !anchors.is_empty() && anchor::fragment_matches(&frag, &anchors);
            if !ok {
                need_extra = true;
            }
            staged.push((candidate, frag, ok));
        }

        if need_extra {
            if !id_index_cache.contains_key(&target) {
                let html = api::page_html(api, &target).await?;
                id_index_cache.insert(target.clone(), anchor::id_index_from_html(&html));
                sleep(api::REQUEST_SLEEP).await;
            }
            if !wikitext_cache.contains_key(&target) {
                let wikitext = api::page_wikitext(api, &target).await?;
                wikitext_cache.insert(target.clone(), wikitext);
                sleep(api::REQUEST_SLEEP).await;
            }
        }
        let empty_index = HashSet::new();
        let id_index = id_index_cache.get(&target).unwrap_or(&empty_index);
        let wikitext = wikitext_cache.get(&target).map(String::as_str).unwrap_or("");

        for (candidate, frag, ok_by_sections) in staged {
            if ok_by_sections {
                continue;
            }
            if !is_broken(&frag, &anchors, id_index, wikitext) {
                continue;
            }
            broken.push(BrokenRedirect {
                redirect: candidate.redirect,
                target: candidate.target,
                fragment_display: frag.replace('_', " "),
                incoming: 0,
            });
        }
    }
    event!(Level::INFO, rows = broken.len(), "broken redirects found");

    for row in broken.iter_mut() {
        row.incoming =
            api::count_backlinks(api, &row.redirect, BACKLINKS_NAMESPACE, BACKLINKS_MAX_PAGES)
                .await?;
        sleep(api::REQUEST_SLEEP).await;
    }

    let broken = rank_and_truncate(broken, MAX_ROWS);

    let text = page_text(&ts, &build_table(&broken));
    output::write_page(api, REPORT_PAGE, text, REPORT_SUMMARY, false).await?;
    event!(Level::INFO, target = REPORT_PAGE, "report page updated");
    output::write_page(api, SIGN_PAGE, "~~~~~", SIGN_SUMMARY, false).await?;
    event!(Level::INFO, target = SIGN_PAGE, "signature page updated");

    Ok(())
}

/// A fragment exists when any of the three signals knows it. The section
/// anchors come first because the wiki engine generates them; the id index
/// and the wikitext parameters catch hand-authored and template-generated
/// anchors respectively.
fn is_broken(
    frag: &str,
    anchors: &HashSet<String>,
    id_index: &HashSet<String>,
    wikitext: &str,
) -> bool {
    if !anchors.is_empty() && anchor::fragment_matches(frag, anchors) {
        return false;
    }
    if anchor::fragment_in_id_index(frag, id_index) {
        return false;
    }
    if anchor::fragment_in_wikitext(wikitext, frag) {
        return false;
    }
    true
}

/// Stable descending sort by incoming-link count, then truncation to the row
/// cap. Ties keep source order.
fn rank_and_truncate(mut rows: Vec<BrokenRedirect>, cap: usize) -> Vec<BrokenRedirect> {
    rows.sort_by(|a, b| b.incoming.cmp(&a.incoming));
    rows.truncate(cap);
    rows
}

fn build_table(rows: &[BrokenRedirect]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(rows.len() * 2 + 3);
    lines.push(String::from(r#"{| class="wikitable sortable""#));
    lines.push(String::from("! ردیف !! تغییرمسیر !! پیوندهای ورودی !! هدف"));
    for (i, row) in rows.iter().enumerate() {
        lines.push(String::from("|-"));
        lines.push(format!(
            "| {rank} || [[{redirect}]] || {incoming} || [[{target}#{frag}|{target}#{frag}]]",
            rank = format::to_persian_digits(&(i + 1).to_string()),
            redirect = row.redirect,
            incoming = format::to_persian_digits(&row.incoming.to_string()),
            target = row.target,
            frag = row.fragment_display,
        ));
    }
    lines.push(String::from("|}"));
    lines.join("\n")
}

fn page_text(ts: &str, table: &str) -> String {
    format!(
        "این صفحه فهرستی از تغییرمسیرهای شکسته به بخش‌ها در ویکی‌پدیای فارسی است.\n\
         تغییرمسیر شکسته به تغییرمسیری گفته می‌شود که به بخشی ناموجود از صفحه‌ای دیگر پیوند دارد.\n\
         ممکن است آن بخش حذف شده باشد یا املای آن عوض شده باشد یا ساختار صفحهٔ مقصد تغییر کرده باشد. ~~~~\n\n\
         ==گزارش==\n\
         زمان داده‌ها: <onlyinclude>{ts}</onlyinclude>.\n\n\
         {table}\n"
    )
}
