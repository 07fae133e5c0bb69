//! Page identifiers and the router.
//!
//! The router is data: a registry of page constructors keyed by [`PageId`].
//! Navigation to an unregistered page falls back to `Index` silently; the
//! caller reports the resolved page, never the requested one, so observers
//! always learn where the user actually landed.

use std::collections::HashMap;
use std::fmt;

use calldock_core::tree::{Ctx, Element, NodeId};

use crate::elements::pages::{
    AppInfoView, CallLogView, DialView, IndexView, LoginView, SettingsView,
};
use crate::message::{CalldockProtocol, SessionSnapshot};

/// Every page the widget can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageId {
    Index,
    Login,
    Dial,
    Call,
    CallLog,
    Settings,
    AppInfo,
}

impl PageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageId::Index => "index",
            PageId::Login => "login",
            PageId::Dial => "dial",
            PageId::Call => "call",
            PageId::CallLog => "call-log",
            PageId::Settings => "settings",
            PageId::AppInfo => "app-info",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds a page element from the current session.
pub type PageCtor = fn(&SessionSnapshot) -> Box<dyn Element<CalldockProtocol>>;

/// Maps page ids to constructors and tracks the page node on screen.
pub struct Router {
    registry: HashMap<PageId, PageCtor>,
    current: Option<(PageId, NodeId)>,
}

impl Default for Router {
    fn default() -> Self {
        Self::with_default_pages()
    }
}

impl Router {
    /// Router with no pages registered. Tests use this to prove fallback.
    pub fn empty() -> Self {
        Self {
            registry: HashMap::new(),
            current: None,
        }
    }

    /// Router covering every constructible page.
    ///
    /// `Call` is deliberately absent: the call page carries call props and is
    /// attached by the session machine, not built from a session snapshot.
    pub fn with_default_pages() -> Self {
        let mut router = Self::empty();
        router.register(PageId::Index, |s| Box::new(IndexView::new(s)));
        router.register(PageId::Login, |s| Box::new(LoginView::new(s)));
        router.register(PageId::Dial, |s| Box::new(DialView::new(s)));
        router.register(PageId::CallLog, |_| Box::new(CallLogView::new()));
        router.register(PageId::Settings, |_| Box::new(SettingsView::new()));
        router.register(PageId::AppInfo, |s| Box::new(AppInfoView::new(s)));
        router
    }

    pub fn register(&mut self, page: PageId, ctor: PageCtor) {
        self.registry.insert(page, ctor);
    }

    pub fn current_page(&self) -> Option<PageId> {
        self.current.map(|(page, _)| page)
    }

    pub fn current_node(&self) -> Option<NodeId> {
        self.current.map(|(_, node)| node)
    }

    /// Which page a navigation request actually lands on.
    pub fn resolve(&self, requested: PageId) -> Option<PageId> {
        if self.registry.contains_key(&requested) {
            Some(requested)
        } else if self.registry.contains_key(&PageId::Index) {
            tracing::debug!(requested = %requested, "page not registered, falling back to index");
            Some(PageId::Index)
        } else {
            None
        }
    }

    /// Swap the current page for `requested`, resolving fallback first.
    ///
    /// Returns the resolved page when a new page was attached; `None` when
    /// the request was a no-op (already on the resolved page) or nothing
    /// could be shown.
    pub fn navigate(
        &mut self,
        ctx: &mut Ctx<'_, CalldockProtocol>,
        session: &SessionSnapshot,
        requested: PageId,
    ) -> Option<PageId> {
        let Some(resolved) = self.resolve(requested) else {
            self.clear(ctx);
            return None;
        };
        if self.current_page() == Some(resolved) {
            return None;
        }

        self.clear(ctx);
        let ctor = self.registry[&resolved];
        let node = ctx.attach_child(ctor(session))?;
        ctx.focus(node);
        self.current = Some((resolved, node));
        Some(resolved)
    }

    /// Record an externally attached page (the call page) as current,
    /// removing whatever was on screen.
    pub fn show_attached(
        &mut self,
        ctx: &mut Ctx<'_, CalldockProtocol>,
        page: PageId,
        node: NodeId,
    ) {
        if self.current_node() != Some(node) {
            self.clear(ctx);
        }
        ctx.focus(node);
        self.current = Some((page, node));
    }

    /// Remove the current page node, if any.
    pub fn clear(&mut self, ctx: &mut Ctx<'_, CalldockProtocol>) {
        if let Some((_, node)) = self.current.take() {
            ctx.remove(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_id_names() {
        assert_eq!(PageId::Index.as_str(), "index");
        assert_eq!(PageId::CallLog.to_string(), "call-log");
    }

    #[test]
    fn test_resolve_prefers_registered_page() {
        let router = Router::with_default_pages();
        assert_eq!(router.resolve(PageId::Settings), Some(PageId::Settings));
    }

    #[test]
    fn test_resolve_falls_back_to_index() {
        // Call is never in the registry.
        let router = Router::with_default_pages();
        assert_eq!(router.resolve(PageId::Call), Some(PageId::Index));

        let mut partial = Router::empty();
        partial.register(PageId::Index, |s| Box::new(IndexView::new(s)));
        assert_eq!(partial.resolve(PageId::Settings), Some(PageId::Index));
    }

    #[test]
    fn test_resolve_without_index_is_none() {
        let router = Router::empty();
        assert_eq!(router.resolve(PageId::Dial), None);
    }
}
