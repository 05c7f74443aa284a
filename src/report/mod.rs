//! The report routines. Each one is a linear batch job:
//! fetch, match/filter, rank, render, publish.

pub mod missing;
pub mod redirects;

pub const REPORT_BROKEN_REDIRECTS: &str = "broken-section-redirects";
pub const REPORT_MISSING_ARTICLES: &str = "missing-articles";

#[derive(Debug)]
pub enum ReportError {
    Db(crate::db::DbError),
    Api(crate::api::ApiError),
    Edit(crate::output::EditPageError),
}

impl std::error::Error for ReportError {}

impl std::fmt::Display for ReportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(e) => e.fmt(f),
            Self::Api(e) => e.fmt(f),
            Self::Edit(e) => e.fmt(f),
        }
    }
}

impl From<crate::db::DbError> for ReportError {
    fn from(e: crate::db::DbError) -> Self {
        Self::Db(e)
    }
}

impl From<crate::api::ApiError> for ReportError {
    fn from(e: crate::api::ApiError) -> Self {
        Self::Api(e)
    }
}

impl From<crate::output::EditPageError> for ReportError {
    fn from(e: crate::output::EditPageError) -> Self {
        Self::Edit(e)
    }
}

impl From<mysql_async::Error> for ReportError {
    fn from(e: mysql_async::Error) -> Self {
        Self::Db(crate::db::DbError::from(e))
    }
}
