//! JSON envelopes shared by the resource controllers.

use axum::{
    async_trait,
    extract::{FromRequestParts, Query},
    http::request::Parts,
};
use serde::Serialize;
use tracing::warn;

pub const DEFAULT_LIMIT: i64 = 10;

/// `{ "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// `?page=&limit=` as sent by the client. Both stay strings so that junk
/// values fall back to defaults instead of rejecting the request.
#[derive(Debug, Default)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let pairs = match Query::<Vec<(String, String)>>::try_from_uri(&parts.uri) {
            Ok(Query(pairs)) => pairs,
            Err(e) => {
                warn!(error = %e, "query string unreadable; using list defaults");
                Vec::new()
            }
        };
        Ok(Self::from_pairs(pairs))
    }
}

impl ListQuery {
    /// Builds the query from raw pairs; a repeated key keeps its last value.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "page" => query.page = Some(value),
                "limit" => query.limit = Some(value),
                _ => {}
            }
        }
        query
    }

    /// `Some(page)` when the listing should be paginated. Empty and `"0"`
    /// mean "not paginated"; other values that are not a positive integer
    /// select the first page.
    pub fn page(&self) -> Option<i64> {
        let raw = self.page.as_deref()?.trim();
        if raw.is_empty() || raw == "0" {
            return None;
        }
        Some(raw.parse::<i64>().ok().filter(|p| *p >= 1).unwrap_or(1))
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub current_page: i64,
    pub from: Option<i64>,
    pub last_page: i64,
    pub path: String,
    pub per_page: i64,
    pub to: Option<i64>,
    pub total: i64,
}

/// Either a length-aware page or a plain capped list.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Paginated {
        data: Vec<T>,
        links: PageLinks,
        meta: PageMeta,
    },
    Plain {
        data: Vec<T>,
    },
}

/// Row window for page `page` of `per_page` rows: `(limit, offset)`.
pub fn window(page: i64, per_page: i64) -> (i64, i64) {
    (per_page, (page - 1).saturating_mul(per_page))
}

impl<T> Listing<T> {
    pub fn plain(data: Vec<T>) -> Self {
        Listing::Plain { data }
    }

    /// Wraps the rows of page `page` out of `total`. `path` is the listing
    /// URL without query string.
    pub fn paginated(data: Vec<T>, page: i64, per_page: i64, total: i64, path: &str) -> Self {
        // per_page and page may be as large as i64::MAX
        let last_page = (total.saturating_add(per_page - 1) / per_page).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = window(page, per_page).1.saturating_add(1);
            (Some(from), Some(from.saturating_add(data.len() as i64 - 1)))
        };
        let url = |p: i64| format!("{path}?page={p}");

        Listing::Paginated {
            links: PageLinks {
                first: url(1),
                last: url(last_page),
                prev: (page > 1).then(|| url(page - 1)),
                next: (page < last_page).then(|| url(page + 1)),
            },
            meta: PageMeta {
                current_page: page,
                from,
                last_page,
                path: path.to_string(),
                per_page,
                to,
                total,
            },
            data,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Listing<U> {
        match self {
            Listing::Paginated { data, links, meta } => Listing::Paginated {
                data: data.into_iter().map(f).collect(),
                links,
                meta,
            },
            Listing::Plain { data } => Listing::Plain {
                data: data.into_iter().map(f).collect(),
            },
        }
    }
}
