//! Read-only queries against the Wikimedia Cloud database replicas.

use std::env;
use std::path::Path;

use mysql_async::prelude::Queryable;
use mysql_async::{Conn, Opts, OptsBuilder};
use tracing::{event, Level};

const REPLICA_USER_VAR: &str = "TOOL_REPLICA_USER";
const REPLICA_PASSWORD_VAR: &str = "TOOL_REPLICA_PASSWORD";

/// A mainspace redirect that points at a section of another page.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct RedirectCandidate {
    pub redirect: String,
    pub target: String,
    pub fragment: String,
}

/// An enwiki article with no fa langlink.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct MissingArticle {
    pub title: String,
    pub length: u64,
}

/// The content replicas a report reads from.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Replica {
    FaWiki,
    EnWiki,
}

impl Replica {
    fn db_name(&self) -> &'static str {
        match self {
            Self::FaWiki => "fawiki_p",
            Self::EnWiki => "enwiki_p",
        }
    }

    fn analytics_host(&self) -> &'static str {
        match self {
            Self::FaWiki => "fawiki.analytics.db.svc.wikimedia.cloud",
            Self::EnWiki => "enwiki.analytics.db.svc.wikimedia.cloud",
        }
    }
}

#[derive(Debug)]
pub enum DbError {
    Config(String),
    Sql(mysql_async::Error),
}

impl std::error::Error for DbError {}

impl From<mysql_async::Error> for DbError {
    fn from(e: mysql_async::Error) -> Self {
        Self::Sql(e)
    }
}

impl std::fmt::Display for DbError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => f.write_str(e),
            Self::Sql(e) => e.fmt(f),
        }
    }
}

/// Logs a warning when `~/replica.my.cnf` is absent. Outside Toolforge the
/// replica connection is likely to fail without it, unless credentials come
/// from the environment.
pub fn warn_if_missing_replica_cnf() {
    let home = env::var("HOME").unwrap_or_default();
    let cnf = Path::new(&home).join("replica.my.cnf");
    if !cnf.exists() {
        event!(
            Level::WARN,
            path = %cnf.display(),
            "replica.my.cnf not found, replica connection may fail outside Toolforge"
        );
    }
}

/// Opens a connection to a replica. Credentials come from
/// `TOOL_REPLICA_USER`/`TOOL_REPLICA_PASSWORD` when both are set, otherwise
/// from `~/replica.my.cnf`.
pub async fn connect(replica: Replica) -> Result<Conn, DbError> {
    if let (Ok(user), Ok(pass)) = (env::var(REPLICA_USER_VAR), env::var(REPLICA_PASSWORD_VAR)) {
        event!(Level::DEBUG, db = replica.db_name(), "connecting with environment credentials");
        let opts = OptsBuilder::default()
            .ip_or_hostname(replica.analytics_host())
            .user(Some(user))
            .pass(Some(pass))
            .db_name(Some(replica.db_name()));
        return Ok(Conn::new(opts).await?);
    }
    event!(Level::DEBUG, db = replica.db_name(), "connecting with replica.my.cnf credentials");
    let info = match replica {
        Replica::FaWiki => toolforge::connection_info!("fawiki", ANALYTICS),
        Replica::EnWiki => toolforge::connection_info!("enwiki", ANALYTICS),
    }
    .map_err(|e| DbError::Config(e.to_string()))?;
    let opts = Opts::from_url(&info.to_string()).map_err(|e| DbError::Config(e.to_string()))?;
    Ok(Conn::new(opts).await?)
}

const REDIRECT_CANDIDATES_SQL: &str = r"SELECT
  p.page_title,
  t.page_title,
  r.rd_fragment
FROM redirect r
JOIN page p
  ON p.page_id = r.rd_from
JOIN page t
  ON t.page_namespace = r.rd_namespace
 AND t.page_title = r.rd_title
WHERE r.rd_namespace = 0
  AND r.rd_fragment IS NOT NULL
  AND r.rd_fragment <> ''
  AND p.page_namespace = 0
  AND p.page_is_redirect = 1
LIMIT ?";

/// Mainspace section-redirects whose target page exists, joined through the
/// redirect table. The fragment is kept raw; normalization happens at match
/// time.
pub async fn redirect_candidates(
    conn: &mut Conn,
    limit: usize,
) -> Result<Vec<RedirectCandidate>, DbError> {
    let rows: Vec<(Vec<u8>, Vec<u8>, Vec<u8>)> =
        conn.exec(REDIRECT_CANDIDATES_SQL, (limit as u64,)).await?;
    Ok(rows
        .into_iter()
        .map(|(redirect, target, fragment)| RedirectCandidate {
            redirect: pretty_title(&redirect),
            target: pretty_title(&target),
            fragment: String::from_utf8_lossy(&fragment).into_owned(),
        })
        .collect())
}

const MISSING_ARTICLES_SQL: &str = r"SELECT p.page_title, p.page_len
FROM page p
LEFT JOIN langlinks ll
  ON ll.ll_from = p.page_id AND ll.ll_lang = 'fa'
WHERE p.page_namespace = 0
  AND p.page_is_redirect = 0
  AND ll.ll_from IS NULL
ORDER BY p.page_len DESC
LIMIT ?";

/// The largest enwiki articles with no fa langlink, by byte size.
pub async fn missing_articles(
    conn: &mut Conn,
    limit: usize,
) -> Result<Vec<MissingArticle>, DbError> {
    let rows: Vec<(Vec<u8>, u64)> = conn.exec(MISSING_ARTICLES_SQL, (limit as u64,)).await?;
    Ok(rows
        .into_iter()
        .map(|(title, length)| MissingArticle {
            title: pretty_title(&title),
            length,
        })
        .collect())
}

/// Decodes a binary title column and converts the stored underscores back to
/// spaces.
fn pretty_title(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).replace('_', " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_title() {
        assert_eq!(pretty_title(b"Foo_bar"), "Foo bar");
        assert_eq!(pretty_title("تهران_بزرگ".as_bytes()), "تهران بزرگ");
        assert_eq!(pretty_title(b"_Leading"), "Leading");
        // invalid UTF-8 decodes lossily instead of failing
        assert_eq!(pretty_title(&[0x41, 0xFF, 0x42]), "A\u{FFFD}B");
    }
}
