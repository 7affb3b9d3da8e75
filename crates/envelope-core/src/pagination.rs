//! Pagination blocks and paginator detection
//!
//! Two paginator serializations are recognised:
//!
//! - offset: `{data, current_page, total, last_page, per_page, from, to, ...}`
//! - cursor: `{data, next_cursor, prev_cursor, per_page, ...}`

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Page position of an offset-based paginator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetPagination {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

impl OffsetPagination {
    /// Compute `last_page`, `from` and `to` for `count` items on `current_page`.
    pub fn from_parts(current_page: u64, per_page: u64, total: u64, count: u64) -> Self {
        let current_page = current_page.max(1);
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };
        let (from, to) = if count == 0 {
            (None, None)
        } else {
            let from = (current_page - 1).saturating_mul(per_page).saturating_add(1);
            (Some(from), Some(from.saturating_add(count - 1)))
        };

        Self {
            current_page,
            last_page,
            per_page,
            total,
            from,
            to,
            next_page_url: None,
            prev_page_url: None,
        }
    }

    pub fn with_urls(mut self, next: Option<String>, prev: Option<String>) -> Self {
        self.next_page_url = next;
        self.prev_page_url = prev;
        self
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            current_page: number_field(object, "current_page").unwrap_or(1),
            last_page: number_field(object, "last_page").unwrap_or(1),
            per_page: number_field(object, "per_page").unwrap_or(0),
            total: number_field(object, "total").unwrap_or(0),
            from: number_field(object, "from"),
            to: number_field(object, "to"),
            next_page_url: string_field(object, "next_page_url"),
            prev_page_url: string_field(object, "prev_page_url"),
        }
    }
}

/// Page position of a cursor-based paginator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorPagination {
    pub per_page: u64,
    pub next_cursor: Option<String>,
    pub prev_cursor: Option<String>,
    pub next_page_url: Option<String>,
    pub prev_page_url: Option<String>,
}

impl CursorPagination {
    fn from_object(object: &Map<String, Value>) -> Self {
        Self {
            per_page: number_field(object, "per_page").unwrap_or(0),
            next_cursor: string_field(object, "next_cursor"),
            prev_cursor: string_field(object, "prev_cursor"),
            next_page_url: string_field(object, "next_page_url"),
            prev_page_url: string_field(object, "prev_page_url"),
        }
    }
}

/// `meta.pagination` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Pagination {
    Offset(OffsetPagination),
    Cursor(CursorPagination),
}

impl Pagination {
    /// Recognise a paginator serialization and split it into page items and
    /// the pagination block.
    ///
    /// Offset paginators carry `data`, `current_page` and `total`; cursor
    /// paginators carry `data` and a `next_cursor` key (possibly null).
    pub fn detect(value: &Value) -> Option<(Vec<Value>, Pagination)> {
        let object = value.as_object()?;
        if !object.contains_key("data") {
            return None;
        }

        let pagination = if object.contains_key("current_page") && object.contains_key("total") {
            Pagination::Offset(OffsetPagination::from_object(object))
        } else if object.contains_key("next_cursor") {
            Pagination::Cursor(CursorPagination::from_object(object))
        } else {
            return None;
        };

        let items = match object.get("data") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Null) | None => Vec::new(),
            Some(other) => vec![other.clone()],
        };

        Some((items, pagination))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Pagination::Offset(page) => offset_value(page),
            Pagination::Cursor(page) => cursor_value(page),
        }
    }
}

fn offset_value(page: &OffsetPagination) -> Value {
    serde_json::json!({
        "current_page": page.current_page,
        "last_page": page.last_page,
        "per_page": page.per_page,
        "total": page.total,
        "from": page.from,
        "to": page.to,
        "next_page_url": page.next_page_url,
        "prev_page_url": page.prev_page_url,
    })
}

fn cursor_value(page: &CursorPagination) -> Value {
    serde_json::json!({
        "per_page": page.per_page,
        "next_cursor": page.next_cursor,
        "prev_cursor": page.prev_cursor,
        "next_page_url": page.next_page_url,
        "prev_page_url": page.prev_page_url,
    })
}

fn number_field(object: &Map<String, Value>, key: &str) -> Option<u64> {
    match object.get(key)? {
        Value::Number(number) => number.as_u64(),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
