//! Missing important articles report: the largest enwiki articles with no
//! fa langlink, ordered by byte size.

use mediawiki::api::Api;
use tracing::{event, Level};

use crate::{db, format, output};
use super::ReportError;

const REPORT_PAGE: &str = "ویکی‌پدیا:گزارش دیتابیس/مقاله‌های مهم ایجادنشده بر پایه حجم";
const SIGN_PAGE: &str = "ویکی‌پدیا:گزارش دیتابیس/مقاله‌های مهم ایجادنشده بر پایه حجم/امضا";

const REPORT_SUMMARY: &str = "به‌روزرسانی خودکار گزارش (مقاله‌های مهم ایجادنشده بر پایه حجم)";
const SIGN_SUMMARY: &str = "به‌روزرسانی خودکار امضا";

const MAX_ROWS: usize = 500;

pub async fn run(api: &mut Api) -> Result<(), ReportError> {
    db::warn_if_missing_replica_cnf();
    let mut conn = db::connect(db::Replica::EnWiki).await?;
    let rows = db::missing_articles(&mut conn, MAX_ROWS).await?;
    conn.disconnect().await?;
    event!(Level::INFO, rows = rows.len(), "missing articles fetched");

    // signature page first, so a transcluded timestamp is fresh by the time
    // the report lands
    output::write_page(api, SIGN_PAGE, "~~~~~", SIGN_SUMMARY, true).await?;
    event!(Level::INFO, target = SIGN_PAGE, "signature page updated");

    let text = build_report_text(&rows);
    output::write_page(api, REPORT_PAGE, text, REPORT_SUMMARY, false).await?;
    event!(Level::INFO, target = REPORT_PAGE, "report page updated");

    Ok(())
}

/// Links to English Wikipedia from fawiki.
fn en_interwiki_link(title: &str) -> String {
    format!("[[:en:{}]]", title)
}

fn build_report_text(rows: &[db::MissingArticle]) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(rows.len() * 2 + 6);

    lines.push(String::from("این فهرست طولانی‌ترین مقاله‌های ویکی‌پدیای انگلیسی را نشان می‌دهد که در ویکی‌پدیای فارسی معادل ندارند (یا دست‌کم پیوند میان‌ویکی داده نشده‌است)."));
    lines.push(String::from("~~~~"));
    lines.push(String::new());
    lines.push(String::from(r#"{| class="wikitable sortable""#));
    lines.push(String::from("! ردیف !! مقاله (en) !! حجم (بایت)"));

    for (i, row) in rows.iter().enumerate() {
        lines.push(String::from("|-"));
        lines.push(format!(
            "| {rank} || {link} || {size}",
            rank = format::format_fa_number((i + 1) as u64),
            link = en_interwiki_link(&row.title),
            size = format::format_fa_number(row.length),
        ));
    }

    lines.push(String::from("|}"));
    lines.push(String::new());

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MissingArticle;

    #[test]
    fn test_en_interwiki_link() {
        assert_eq!(en_interwiki_link("Some Article"), "[[:en:Some Article]]");
    }

    #[test]
    fn test_build_report_text() {
        let rows = vec![
            MissingArticle { title: "First Article".to_string(), length: 427514 },
            MissingArticle { title: "Second Article".to_string(), length: 9000 },
        ];
        let text = build_report_text(&rows);
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines[3], r#"{| class="wikitable sortable""#);
        assert_eq!(lines[4], "! ردیف !! مقاله (en) !! حجم (بایت)");
        assert_eq!(lines[6], "| ۱ || [[:en:First Article]] || ۴۲۷٬۵۱۴");
        assert_eq!(lines[8], "| ۲ || [[:en:Second Article]] || ۹٬۰۰۰");
        assert_eq!(lines[lines.len() - 2], "|}");
        assert_eq!(lines[lines.len() - 1], "");
    }

    #[test]
    fn test_build_report_text_empty() {
        let text = build_report_text(&[]);
        assert!(text.contains(r#"{| class="wikitable sortable""#));
        assert!(!text.contains("|-"));
    }
}
