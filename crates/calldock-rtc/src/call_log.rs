//! Cursor pagination over the call-log service.
//!
//! The service hands out opaque cursors; a page with `next_cursor: None` is
//! the last one. The widget's log view keeps its own loading/has-next guards
//! on top of these types.

use serde::{Deserialize, Serialize};

use calldock_core::types::CallRecord;

/// Default page size when the caller does not pick one.
pub const DEFAULT_PAGE_LIMIT: usize = 30;

/// One page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogQuery {
    /// `None` asks for the newest page.
    pub cursor: Option<String>,
    pub limit: usize,
}

impl Default for CallLogQuery {
    fn default() -> Self {
        Self {
            cursor: None,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl CallLogQuery {
    pub fn first_page(limit: usize) -> Self {
        Self {
            cursor: None,
            limit,
        }
    }
}

/// One page response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogPage {
    pub records: Vec<CallRecord>,
    pub next_cursor: Option<String>,
}

impl CallLogPage {
    /// Whether another page exists after this one.
    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    /// Query for the page after this one, `None` when exhausted.
    pub fn next_query(&self, limit: usize) -> Option<CallLogQuery> {
        self.next_cursor.as_ref().map(|cursor| CallLogQuery {
            cursor: Some(cursor.clone()),
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_is_first_page() {
        let query = CallLogQuery::default();
        assert!(query.cursor.is_none());
        assert_eq!(query.limit, DEFAULT_PAGE_LIMIT);
    }

    #[test]
    fn test_page_chaining() {
        let page = CallLogPage {
            records: vec![],
            next_cursor: Some("30".into()),
        };
        assert!(page.has_next());
        let next = page.next_query(10).unwrap();
        assert_eq!(next.cursor.as_deref(), Some("30"));
        assert_eq!(next.limit, 10);

        let last = CallLogPage {
            records: vec![],
            next_cursor: None,
        };
        assert!(!last.has_next());
        assert!(last.next_query(10).is_none());
    }
}
