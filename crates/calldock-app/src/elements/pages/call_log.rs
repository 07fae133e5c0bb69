//! Paginated call history.

use std::any::Any;

use calldock_core::surface::Surface;
use calldock_core::tree::{Ctx, Element, NodeId, Tree};
use calldock_core::types::CallRecord;
use calldock_rtc::DEFAULT_PAGE_LIMIT;

use crate::elements::widgets::call_log_row;
use crate::message::{CalldockProtocol, DownMsg, Effect, Gesture, UpMsg};

/// Cursor-paginated list of finished calls.
///
/// Two guards protect the fetch path: `is_loading` drops duplicate requests
/// while a page is in flight, and `has_next` stops fetching once the service
/// reports the log exhausted.
pub struct CallLogView {
    records: Vec<CallRecord>,
    next_cursor: Option<String>,
    has_next: bool,
    is_loading: bool,
    selected: usize,
}

impl Default for CallLogView {
    fn default() -> Self {
        Self::new()
    }
}

impl CallLogView {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_cursor: None,
            has_next: true,
            is_loading: false,
            selected: 0,
        }
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    fn maybe_fetch(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        if self.is_loading || !self.has_next {
            return;
        }
        self.is_loading = true;
        ctx.effect(Effect::FetchCallLog {
            cursor: self.next_cursor.clone(),
            limit: DEFAULT_PAGE_LIMIT,
        });
    }
}

impl Element<CalldockProtocol> for CallLogView {
    fn kind(&self) -> &'static str {
        "call-log"
    }

    fn on_attached(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        self.maybe_fetch(ctx);
    }

    fn recv_down(&mut self, _ctx: &mut Ctx<'_, CalldockProtocol>, msg: DownMsg) {
        match msg {
            DownMsg::LogPageLoaded {
                records,
                next_cursor,
            } => {
                self.records.extend(records);
                self.has_next = next_cursor.is_some();
                self.next_cursor = next_cursor;
                self.is_loading = false;
            }
            DownMsg::LogLoadFailed { .. } => {
                self.is_loading = false;
            }
            _ => {}
        }
    }

    fn on_gesture(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>, gesture: &Gesture) -> bool {
        match gesture {
            Gesture::Up => {
                self.selected = self.selected.saturating_sub(1);
                true
            }
            Gesture::Down => {
                if self.selected + 1 < self.records.len() {
                    self.selected += 1;
                } else {
                    // Scrolled past the last loaded row.
                    ctx.send_to_parent(UpMsg::LoadMoreRequested);
                    self.maybe_fetch(ctx);
                }
                true
            }
            Gesture::Enter => {
                // Redial the selected entry.
                if let Some(record) = self.records.get(self.selected) {
                    ctx.send_to_parent(UpMsg::DialRequested {
                        callee: record.peer.user_id.clone(),
                        kind: record.kind,
                    });
                }
                true
            }
            Gesture::Esc | Gesture::Backspace => {
                ctx.send_to_parent(UpMsg::BackRequested);
                true
            }
            _ => false,
        }
    }

    fn surface(&self, _tree: &Tree<CalldockProtocol>, _me: NodeId) -> Surface {
        Surface::List {
            title: "Call log".to_string(),
            items: self.records.iter().map(call_log_row).collect(),
            selected: (!self.records.is_empty()).then_some(self.selected),
            loading_more: self.is_loading,
            empty_hint: "No calls yet".to_string(),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calldock_core::tree::Tree;
    use calldock_core::types::{CallDirection, CallId, CallKind, EndReason, Peer};
    use chrono::Utc;

    use crate::elements::testing::Host;

    fn record(n: usize) -> CallRecord {
        CallRecord {
            call_id: CallId::new(format!("c{n}")),
            kind: CallKind::Voice,
            direction: CallDirection::Outbound,
            peer: Peer::new("bob"),
            started_at: Utc::now(),
            duration_secs: n as u64,
            end_reason: EndReason::Completed,
        }
    }

    fn setup() -> (Tree<CalldockProtocol>, NodeId, NodeId) {
        let mut tree: Tree<CalldockProtocol> = Tree::new();
        let root = tree.attach_root(Host::boxed()).unwrap();
        let log = tree.attach(root, Box::new(CallLogView::new())).unwrap();
        tree.set_focus(log);
        (tree, root, log)
    }

    fn fetch_count(tree: &mut Tree<CalldockProtocol>) -> usize {
        tree.take_effects()
            .iter()
            .filter(|e| matches!(e, Effect::FetchCallLog { .. }))
            .count()
    }

    #[test]
    fn test_attach_fetches_first_page() {
        let (mut tree, _root, log) = setup();
        assert_eq!(fetch_count(&mut tree), 1);
        assert!(tree.get::<CallLogView>(log).unwrap().is_loading());
    }

    #[test]
    fn test_no_duplicate_fetch_while_loading() {
        let (mut tree, _root, _log) = setup();
        fetch_count(&mut tree);

        // Still loading the first page; scrolling down must not re-fetch.
        tree.dispatch_gesture(&Gesture::Down);
        tree.dispatch_gesture(&Gesture::Down);
        assert_eq!(fetch_count(&mut tree), 0);
    }

    #[test]
    fn test_scroll_to_end_fetches_next_page() {
        let (mut tree, _root, log) = setup();
        fetch_count(&mut tree);

        tree.send_down(
            log,
            DownMsg::LogPageLoaded {
                records: vec![record(0), record(1)],
                next_cursor: Some("2".to_string()),
            },
        );
        tree.dispatch_gesture(&Gesture::Down); // to row 1
        assert_eq!(fetch_count(&mut tree), 0);
        tree.dispatch_gesture(&Gesture::Down); // past the end
        assert_eq!(fetch_count(&mut tree), 1);

        let view = tree.get::<CallLogView>(log).unwrap();
        assert!(view.is_loading());
        assert_eq!(view.records().len(), 2);
    }

    #[test]
    fn test_exhausted_log_stops_fetching() {
        let (mut tree, _root, log) = setup();
        fetch_count(&mut tree);

        tree.send_down(
            log,
            DownMsg::LogPageLoaded {
                records: vec![record(0)],
                next_cursor: None,
            },
        );
        let view = tree.get::<CallLogView>(log).unwrap();
        assert!(!view.has_next());

        tree.dispatch_gesture(&Gesture::Down);
        assert_eq!(fetch_count(&mut tree), 0);
    }

    #[test]
    fn test_failed_page_clears_loading_and_allows_retry() {
        let (mut tree, _root, log) = setup();
        fetch_count(&mut tree);

        tree.send_down(
            log,
            DownMsg::LogLoadFailed {
                message: "boom".to_string(),
            },
        );
        assert!(!tree.get::<CallLogView>(log).unwrap().is_loading());

        tree.dispatch_gesture(&Gesture::Down);
        assert_eq!(fetch_count(&mut tree), 1);
    }

    #[test]
    fn test_enter_redials_selected_record() {
        let (mut tree, root, log) = setup();
        tree.send_down(
            log,
            DownMsg::LogPageLoaded {
                records: vec![record(0)],
                next_cursor: None,
            },
        );
        tree.dispatch_gesture(&Gesture::Enter);
        let host = tree.get::<Host>(root).unwrap();
        assert_eq!(
            host.up_msgs,
            vec![UpMsg::DialRequested {
                callee: calldock_core::types::UserId::new("bob"),
                kind: CallKind::Voice,
            }]
        );
    }
}
