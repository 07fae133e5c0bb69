//! # Element Tree
//!
//! Arena-backed composition tree for widget elements. The tree owns every
//! element; the rest of the system refers to nodes through copyable
//! [`NodeId`] handles carrying a generation counter, so a handle to a
//! removed node can never alias a later occupant of the same slot.
//!
//! Messaging is strictly one hop: an element can send up to its parent and
//! down to its direct children, nothing else. Dispatch is synchronous and
//! depth-first. While a hook runs, the receiving element is taken out of its
//! slot, which gives the hook free mutable access to the rest of the tree
//! through [`Ctx`] without interior mutability. Messages addressed to a node
//! that is absent, stale, or currently running a hook are dropped silently.
//!
//! Messages queued from inside a hook are delivered after the hook returns,
//! in queue order, so no hook ever re-enters the element that sent them.
//!
//! Side effects (anything async) never run here. Elements queue
//! protocol-defined effect values and the embedding shell drains them with
//! [`Tree::take_effects`].

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;

use crate::error::{Error, Result};
use crate::surface::Surface;

// ─────────────────────────────────────────────────────────────────
// Handles and Protocol
// ─────────────────────────────────────────────────────────────────

/// Handle to a node in a [`Tree`].
///
/// Slots are reused after removal; the generation counter distinguishes the
/// old occupant's handles from the new one's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}v{}", self.index, self.generation)
    }
}

/// Message and effect types a tree of elements is wired with.
///
/// A widget family defines one protocol type and every element in its tree
/// speaks it. Keeping the types on a trait rather than on each element means
/// adding a message variant is a compile error at every non-exhaustive
/// consumer.
pub trait Protocol: 'static {
    /// Child-to-parent messages.
    type Up: fmt::Debug;
    /// Parent-to-child messages. Cloned when fanned out to several children.
    type Down: fmt::Debug + Clone;
    /// Side effects executed by the embedding shell.
    type Effect: fmt::Debug;
    /// User input unit routed through the focus chain.
    type Gesture: fmt::Debug;
    /// Identifier for periodic ticks delivered to a single node.
    type Timer: fmt::Debug + Copy + PartialEq + Eq + std::hash::Hash;
}

/// A node's behavior.
///
/// All hooks have no-op defaults; leaves implement the few they need.
/// `surface` must be pure: it describes the element without mutating it.
pub trait Element<P: Protocol>: Any {
    /// Stable name for logs and debugging.
    fn kind(&self) -> &'static str;

    /// Called once, right after the node joins the tree.
    fn on_attached(&mut self, _ctx: &mut Ctx<'_, P>) {}

    /// Called during teardown, before the node is detached from its parent.
    fn on_removed(&mut self, _ctx: &mut Ctx<'_, P>) {}

    /// A direct child sent a message up.
    fn recv_up(&mut self, _ctx: &mut Ctx<'_, P>, _child: NodeId, _msg: P::Up) {}

    /// The parent sent a message down.
    fn recv_down(&mut self, _ctx: &mut Ctx<'_, P>, _msg: P::Down) {}

    /// Input gesture. Return `true` to stop it bubbling to the parent.
    fn on_gesture(&mut self, _ctx: &mut Ctx<'_, P>, _gesture: &P::Gesture) -> bool {
        false
    }

    /// A periodic tick addressed to this node.
    fn on_timer(&mut self, _ctx: &mut Ctx<'_, P>, _timer: P::Timer) {}

    /// Pure view description.
    fn surface(&self, _tree: &Tree<P>, _me: NodeId) -> Surface {
        Surface::None
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

// ─────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────

struct Slot<P: Protocol> {
    generation: u32,
    /// `None` while vacant or while the element is out running a hook.
    element: Option<Box<dyn Element<P>>>,
    /// Live node (the element may be temporarily taken out).
    occupied: bool,
    /// Removed while its element was out on the stack; freed on put-back.
    doomed: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

enum Op<P: Protocol> {
    /// Deliver `msg` to `to` as coming from child `from`.
    Up { from: NodeId, to: NodeId, msg: P::Up },
    Down { to: NodeId, msg: P::Down },
}

/// Arena of elements plus the dispatch machinery.
pub struct Tree<P: Protocol> {
    slots: Vec<Slot<P>>,
    free: Vec<u32>,
    root: Option<NodeId>,
    focus: Option<NodeId>,
    len: usize,
    pending: VecDeque<Op<P>>,
    effects: Vec<P::Effect>,
}

impl<P: Protocol> Default for Tree<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Protocol> Tree<P> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: None,
            focus: None,
            len: 0,
            pending: VecDeque::new(),
            effects: Vec::new(),
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Attachment
    // ─────────────────────────────────────────────────────────────

    /// Install the root element. Fails if a root is already attached.
    pub fn attach_root(&mut self, element: Box<dyn Element<P>>) -> Result<NodeId> {
        if self.root.is_some() {
            return Err(Error::tree("root element already attached"));
        }
        let id = self.alloc_slot(element, None);
        self.root = Some(id);
        self.len += 1;
        tracing::debug!(node = %id, kind = self.kind_of(id).unwrap_or("?"), "root attached");
        self.run_hook(id, |el, ctx| el.on_attached(ctx));
        self.drain_pending();
        Ok(id)
    }

    /// Attach `element` as the last child of `parent`.
    pub fn attach(&mut self, parent: NodeId, element: Box<dyn Element<P>>) -> Result<NodeId> {
        let id = self.attach_inner(parent, element)?;
        self.drain_pending();
        Ok(id)
    }

    fn attach_inner(&mut self, parent: NodeId, element: Box<dyn Element<P>>) -> Result<NodeId> {
        if !self.contains(parent) {
            return Err(Error::tree(format!("attach under stale node {parent}")));
        }
        let id = self.alloc_slot(element, Some(parent));
        self.slots[parent.index as usize].children.push(id);
        self.len += 1;
        tracing::trace!(node = %id, parent = %parent, kind = self.kind_of(id).unwrap_or("?"), "attached");
        self.run_hook(id, |el, ctx| el.on_attached(ctx));
        Ok(id)
    }

    fn alloc_slot(&mut self, element: Box<dyn Element<P>>, parent: Option<NodeId>) -> NodeId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.element = Some(element);
            slot.occupied = true;
            slot.doomed = false;
            slot.parent = parent;
            slot.children.clear();
            NodeId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                element: Some(element),
                occupied: true,
                doomed: false,
                parent,
                children: Vec::new(),
            });
            NodeId {
                index,
                generation: 0,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Removal
    // ─────────────────────────────────────────────────────────────

    /// Remove a node and its whole subtree.
    ///
    /// Idempotent: removing an absent or stale id returns `false` and changes
    /// nothing. Teardown order per node: `on_removed` hook (parent link still
    /// intact), detach from the parent's child list, children recursively in
    /// reverse insertion order, then the slot is freed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let removed = self.remove_inner(id);
        self.drain_pending();
        removed
    }

    fn remove_inner(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }

        if self.slots[id.index as usize].element.is_none() {
            // The element is out on the stack in an enclosing hook. Doom the
            // slot, tear down everything around it now; its own teardown hook
            // runs when the hook frame returns (see put_back).
            self.doom(id);
            return true;
        }

        // Teardown hook runs first, while the parent link is still intact,
        // so a final send_to_parent from the hook still resolves.
        let mut element = match self.take_element(id) {
            Some(el) => el,
            None => return false,
        };
        {
            let mut ctx = Ctx {
                tree: self,
                node: id,
            };
            element.on_removed(&mut ctx);
        }
        tracing::trace!(node = %id, kind = element.kind(), "removed");

        // The hook may have removed the node itself; doom() then already
        // detached it and tore down its children.
        let slot = &mut self.slots[id.index as usize];
        if slot.generation == id.generation && slot.occupied {
            if !slot.doomed {
                let parent = slot.parent.take();
                let children = std::mem::take(&mut slot.children);
                if let Some(parent) = parent {
                    self.unlink_child(parent, id);
                }
                for child in children.iter().rev() {
                    self.remove_inner(*child);
                }
                self.forget(id);
            }
            self.free_slot(id.index);
        }
        true
    }

    /// Detach a taken-out node from the tree; the slot itself is freed later
    /// by `put_back`.
    fn doom(&mut self, id: NodeId) {
        let slot = &mut self.slots[id.index as usize];
        slot.doomed = true;
        let parent = slot.parent.take();
        let children = std::mem::take(&mut slot.children);
        if let Some(parent) = parent {
            self.unlink_child(parent, id);
        }
        for child in children.iter().rev() {
            self.remove_inner(*child);
        }
        self.forget(id);
    }

    /// Bookkeeping shared by both removal paths.
    fn forget(&mut self, id: NodeId) {
        self.len -= 1;
        if self.focus == Some(id) {
            self.focus = None;
        }
        if self.root == Some(id) {
            self.root = None;
        }
    }

    fn unlink_child(&mut self, parent: NodeId, child: NodeId) {
        if let Some(slot) = self.slots.get_mut(parent.index as usize) {
            if slot.generation == parent.generation {
                slot.children.retain(|c| *c != child);
            }
        }
    }

    fn free_slot(&mut self, index: u32) {
        let slot = &mut self.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        slot.element = None;
        slot.occupied = false;
        slot.doomed = false;
        slot.parent = None;
        slot.children.clear();
        self.free.push(index);
    }

    // ─────────────────────────────────────────────────────────────
    // Dispatch
    // ─────────────────────────────────────────────────────────────

    /// Deliver a message to `to` as if sent by its parent.
    pub fn send_down(&mut self, to: NodeId, msg: P::Down) {
        self.pending.push_back(Op::Down { to, msg });
        self.drain_pending();
    }

    /// Deliver a message to the parent of `from`. Dropped silently when
    /// `from` is the root or stale.
    pub fn send_up(&mut self, from: NodeId, msg: P::Up) {
        match self.parent_of(from) {
            Some(to) => {
                self.pending.push_back(Op::Up { from, to, msg });
                self.drain_pending();
            }
            None => {
                tracing::trace!(node = %from, ?msg, "up message from parentless node dropped");
            }
        }
    }

    /// Route a gesture from the focused node (or the root) up through its
    /// ancestors until one consumes it.
    pub fn dispatch_gesture(&mut self, gesture: &P::Gesture) -> bool {
        let mut cursor = self.focus.or(self.root);
        let mut consumed = false;
        while let Some(id) = cursor {
            if !self.contains(id) {
                break;
            }
            let parent = self.parent_of(id);
            let mut hit = false;
            self.run_hook(id, |el, ctx| hit = el.on_gesture(ctx, gesture));
            if hit {
                consumed = true;
                break;
            }
            cursor = parent;
        }
        self.drain_pending();
        consumed
    }

    /// Deliver a periodic tick to one node. Ticks for stale nodes are
    /// dropped silently.
    pub fn dispatch_timer(&mut self, to: NodeId, timer: P::Timer) {
        self.run_hook(to, |el, ctx| el.on_timer(ctx, timer));
        self.drain_pending();
    }

    fn drain_pending(&mut self) {
        while let Some(op) = self.pending.pop_front() {
            match op {
                Op::Up { from, to, msg } => {
                    self.run_hook(to, |el, ctx| el.recv_up(ctx, from, msg));
                }
                Op::Down { to, msg } => {
                    self.run_hook(to, |el, ctx| el.recv_down(ctx, msg));
                }
            }
        }
    }

    /// Take the element out, run `f` with a [`Ctx`] over the rest of the
    /// tree, put it back. Deliveries to nodes that are gone or already out
    /// are dropped here.
    fn run_hook<F>(&mut self, id: NodeId, f: F)
    where
        F: FnOnce(&mut dyn Element<P>, &mut Ctx<'_, P>),
    {
        let mut element = match self.take_element(id) {
            Some(el) => el,
            None => {
                tracing::trace!(node = %id, "delivery to absent node dropped");
                return;
            }
        };
        {
            let mut ctx = Ctx {
                tree: self,
                node: id,
            };
            f(element.as_mut(), &mut ctx);
        }
        self.put_back(id, element);
    }

    fn take_element(&mut self, id: NodeId) -> Option<Box<dyn Element<P>>> {
        if !self.contains(id) {
            return None;
        }
        self.slots[id.index as usize].element.take()
    }

    fn put_back(&mut self, id: NodeId, mut element: Box<dyn Element<P>>) {
        let Some(slot) = self.slots.get_mut(id.index as usize) else {
            return;
        };
        if slot.generation != id.generation || !slot.occupied {
            return;
        }
        if slot.doomed {
            // Removed while running a hook. Its subtree and links are
            // already gone; the teardown hook runs here, late but exactly
            // once.
            {
                let mut ctx = Ctx {
                    tree: self,
                    node: id,
                };
                element.on_removed(&mut ctx);
            }
            tracing::trace!(node = %id, kind = element.kind(), "removed (deferred)");
            self.free_slot(id.index);
        } else {
            slot.element = Some(element);
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Effects
    // ─────────────────────────────────────────────────────────────

    /// Drain all effects queued by element hooks since the last call.
    pub fn take_effects(&mut self) -> Vec<P::Effect> {
        std::mem::take(&mut self.effects)
    }

    // ─────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────

    fn live_slot(&self, id: NodeId) -> Option<&Slot<P>> {
        let slot = self.slots.get(id.index as usize)?;
        (slot.generation == id.generation && slot.occupied && !slot.doomed).then_some(slot)
    }

    /// Whether `id` refers to a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.live_slot(id).is_some()
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.live_slot(id)?.parent
    }

    pub fn children_of(&self, id: NodeId) -> &[NodeId] {
        self.live_slot(id)
            .map(|slot| slot.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focus
    }

    /// Move input focus. Returns `false` for a stale id.
    pub fn set_focus(&mut self, id: NodeId) -> bool {
        if self.contains(id) {
            self.focus = Some(id);
            true
        } else {
            false
        }
    }

    pub fn clear_focus(&mut self) {
        self.focus = None;
    }

    pub fn kind_of(&self, id: NodeId) -> Option<&'static str> {
        Some(self.live_slot(id)?.element.as_ref()?.kind())
    }

    /// Downcast access to a node's element.
    pub fn get<T: Element<P>>(&self, id: NodeId) -> Option<&T> {
        self.live_slot(id)?
            .element
            .as_ref()?
            .as_any()
            .downcast_ref::<T>()
    }

    pub fn get_mut<T: Element<P>>(&mut self, id: NodeId) -> Option<&mut T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation || !slot.occupied || slot.doomed {
            return None;
        }
        slot.element.as_mut()?.as_any_mut().downcast_mut::<T>()
    }

    /// Ids of all live nodes, in slot order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.occupied && !slot.doomed)
            .map(|(index, slot)| NodeId {
                index: index as u32,
                generation: slot.generation,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // ─────────────────────────────────────────────────────────────
    // Surfaces
    // ─────────────────────────────────────────────────────────────

    /// View description of one node. `Surface::None` for stale nodes and
    /// nodes currently running a hook.
    pub fn surface_of(&self, id: NodeId) -> Surface {
        match self.live_slot(id).and_then(|slot| slot.element.as_ref()) {
            Some(element) => element.surface(self, id),
            None => Surface::None,
        }
    }

    /// View description of the whole tree, from the root.
    pub fn surface(&self) -> Surface {
        match self.root {
            Some(root) => self.surface_of(root),
            None => Surface::None,
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Ctx
// ─────────────────────────────────────────────────────────────────

/// Handle to the tree given to an element while one of its hooks runs.
///
/// The element itself is out of its slot for the duration, so everything
/// here operates on the rest of the tree. Messages are queued and delivered
/// after the hook returns; attachment, removal, and focus apply immediately.
pub struct Ctx<'a, P: Protocol> {
    tree: &'a mut Tree<P>,
    node: NodeId,
}

impl<P: Protocol> Ctx<'_, P> {
    /// The node whose hook is running.
    pub fn me(&self) -> NodeId {
        self.node
    }

    /// Queue a message to the parent. Silent no-op at the root.
    pub fn send_to_parent(&mut self, msg: P::Up) {
        match self.tree.parent_of(self.node) {
            Some(to) => self.tree.pending.push_back(Op::Up {
                from: self.node,
                to,
                msg,
            }),
            None => {
                tracing::trace!(node = %self.node, ?msg, "up message from root dropped");
            }
        }
    }

    /// Queue a message to every current child, in child order.
    pub fn send_to_children(&mut self, msg: P::Down) {
        let children: Vec<NodeId> = self.tree.children_of(self.node).to_vec();
        for child in children {
            self.tree.pending.push_back(Op::Down {
                to: child,
                msg: msg.clone(),
            });
        }
    }

    /// Queue a message to one direct child. Messages to anything that is not
    /// a direct child are dropped; the tree is strictly one-hop.
    pub fn send_down_to(&mut self, child: NodeId, msg: P::Down) {
        if self.tree.parent_of(child) == Some(self.node) {
            self.tree.pending.push_back(Op::Down { to: child, msg });
        } else {
            tracing::trace!(node = %self.node, target = %child, "down message to non-child dropped");
        }
    }

    /// Hand a side effect to the embedding shell.
    pub fn effect(&mut self, effect: P::Effect) {
        self.tree.effects.push(effect);
    }

    /// Attach a new child under this node. `None` only if this node removed
    /// itself earlier in the same hook.
    pub fn attach_child(&mut self, element: Box<dyn Element<P>>) -> Option<NodeId> {
        match self.tree.attach_inner(self.node, element) {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::trace!(node = %self.node, "attach_child after self-removal dropped");
                None
            }
        }
    }

    /// Remove a node (typically one of this node's children). Same
    /// idempotent semantics as [`Tree::remove`].
    pub fn remove(&mut self, id: NodeId) -> bool {
        self.tree.remove_inner(id)
    }

    /// Remove this node itself. Teardown of the subtree happens now; this
    /// element's own `on_removed` runs when the current hook returns.
    pub fn remove_self(&mut self) {
        self.tree.remove_inner(self.node);
    }

    pub fn focus(&mut self, id: NodeId) -> bool {
        self.tree.set_focus(id)
    }

    pub fn focus_self(&mut self) {
        self.tree.focus = Some(self.node);
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.tree.parent_of(self.node)
    }

    pub fn children(&self) -> &[NodeId] {
        self.tree.children_of(self.node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.tree.contains(id)
    }

    pub fn kind_of(&self, id: NodeId) -> Option<&'static str> {
        self.tree.kind_of(id)
    }

    pub fn get<T: Element<P>>(&self, id: NodeId) -> Option<&T> {
        self.tree.get(id)
    }

    pub fn get_mut<T: Element<P>>(&mut self, id: NodeId) -> Option<&mut T> {
        self.tree.get_mut(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestProto;

    impl Protocol for TestProto {
        type Up = String;
        type Down = String;
        type Effect = String;
        type Gesture = char;
        type Timer = u8;
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn log_of(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Records every hook invocation; behavior knobs cover the dispatch
    /// edge cases.
    struct Probe {
        name: &'static str,
        log: Log,
        consume_gestures: bool,
        /// Send "pong" to the parent when receiving "ping-parent".
        /// Remove self when receiving "die".
        /// Fan "fan-out" to children when receiving "fan".
        /// Attach a child probe and greet it when receiving "spawn".
        spawn_log: Option<Log>,
        cross_target: Option<NodeId>,
    }

    impl Probe {
        fn new(name: &'static str, log: &Log) -> Box<Self> {
            Box::new(Self {
                name,
                log: Arc::clone(log),
                consume_gestures: false,
                spawn_log: None,
                cross_target: None,
            })
        }

        fn consuming(name: &'static str, log: &Log) -> Box<Self> {
            let mut probe = Self::new(name, log);
            probe.consume_gestures = true;
            probe
        }

        fn note(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }
    }

    impl Element<TestProto> for Probe {
        fn kind(&self) -> &'static str {
            "probe"
        }

        fn on_attached(&mut self, _ctx: &mut Ctx<'_, TestProto>) {
            self.note(format!("{}:attached", self.name));
        }

        fn on_removed(&mut self, _ctx: &mut Ctx<'_, TestProto>) {
            self.note(format!("{}:removed", self.name));
        }

        fn recv_up(&mut self, _ctx: &mut Ctx<'_, TestProto>, _child: NodeId, msg: String) {
            self.note(format!("{}:up:{}", self.name, msg));
        }

        fn recv_down(&mut self, ctx: &mut Ctx<'_, TestProto>, msg: String) {
            self.note(format!("{}:down:{}", self.name, msg));
            match msg.as_str() {
                "ping-parent" => ctx.send_to_parent("pong".to_string()),
                "die" => ctx.remove_self(),
                "fan" => ctx.send_to_children("fan-out".to_string()),
                "spawn" => {
                    let log = self.spawn_log.as_ref().unwrap_or(&self.log);
                    let child = Probe::new("spawned", log);
                    if let Some(id) = ctx.attach_child(child) {
                        ctx.send_down_to(id, "hello".to_string());
                    }
                }
                "cross" => {
                    if let Some(target) = self.cross_target {
                        ctx.send_down_to(target, "crossed".to_string());
                    }
                }
                "effect" => ctx.effect(format!("{}-effect", self.name)),
                _ => {}
            }
        }

        fn on_gesture(&mut self, _ctx: &mut Ctx<'_, TestProto>, gesture: &char) -> bool {
            self.note(format!("{}:gesture:{}", self.name, gesture));
            self.consume_gestures
        }

        fn on_timer(&mut self, _ctx: &mut Ctx<'_, TestProto>, timer: u8) {
            self.note(format!("{}:timer:{}", self.name, timer));
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn assert_links_consistent(tree: &Tree<TestProto>) {
        for id in tree.node_ids() {
            for child in tree.children_of(id) {
                assert_eq!(
                    tree.parent_of(*child),
                    Some(id),
                    "child {child} does not point back at parent {id}"
                );
            }
            if let Some(parent) = tree.parent_of(id) {
                assert!(
                    tree.children_of(parent).contains(&id),
                    "parent {parent} does not list child {id}"
                );
            } else {
                assert_eq!(tree.root(), Some(id), "parentless node {id} is not the root");
            }
        }
    }

    #[test]
    fn test_attach_links_parent_and_children() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        let b = tree.attach(root, Probe::new("b", &log)).unwrap();

        assert_eq!(tree.len(), 3);
        assert_eq!(tree.children_of(root), &[a, b]);
        assert_eq!(tree.parent_of(a), Some(root));
        assert_eq!(tree.parent_of(b), Some(root));
        assert_eq!(tree.parent_of(root), None);
        assert_links_consistent(&tree);
        assert_eq!(
            log_of(&log),
            vec!["root:attached", "a:attached", "b:attached"]
        );
    }

    #[test]
    fn test_attach_root_twice_fails() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        tree.attach_root(Probe::new("root", &log)).unwrap();
        assert!(tree.attach_root(Probe::new("other", &log)).is_err());
    }

    #[test]
    fn test_attach_under_stale_parent_fails() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        tree.remove(a);
        assert!(tree.attach(a, Probe::new("b", &log)).is_err());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();

        assert!(tree.remove(a));
        let len_after_first = tree.len();
        assert!(!tree.remove(a));
        assert_eq!(tree.len(), len_after_first);
        assert!(tree.children_of(root).is_empty());
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_remove_teardown_order_children_reversed() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let x = tree.attach(root, Probe::new("x", &log)).unwrap();
        tree.attach(x, Probe::new("a", &log)).unwrap();
        tree.attach(x, Probe::new("b", &log)).unwrap();
        tree.attach(x, Probe::new("c", &log)).unwrap();
        log.lock().unwrap().clear();

        assert!(tree.remove(x));
        assert_eq!(
            log_of(&log),
            vec!["x:removed", "c:removed", "b:removed", "a:removed"]
        );
        assert_eq!(tree.len(), 1);
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_remove_root_empties_tree() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        tree.attach(root, Probe::new("a", &log)).unwrap();

        assert!(tree.remove(root));
        assert!(tree.is_empty());
        assert_eq!(tree.root(), None);
        assert!(matches!(tree.surface(), Surface::None));
    }

    #[test]
    fn test_remove_clears_focus() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        assert!(tree.set_focus(a));
        tree.remove(a);
        assert_eq!(tree.focused(), None);
    }

    #[test]
    fn test_stale_id_does_not_alias_reused_slot() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let old = tree.attach(root, Probe::new("old", &log)).unwrap();
        tree.remove(old);
        let new = tree.attach(root, Probe::new("new", &log)).unwrap();

        // Same slot, different generation.
        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(!tree.contains(old));
        assert!(tree.contains(new));
        assert!(tree.get::<Probe>(old).is_none());
        assert_eq!(tree.get::<Probe>(new).unwrap().name, "new");
    }

    #[test]
    fn test_delivery_to_removed_node_is_silent() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        tree.remove(a);
        log.lock().unwrap().clear();

        tree.send_down(a, "late".to_string());
        tree.dispatch_timer(a, 7);
        assert!(log_of(&log).is_empty());
    }

    #[test]
    fn test_up_message_from_root_is_silent() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        log.lock().unwrap().clear();

        // The root's recv_down handler sends to its parent, which it lacks.
        tree.send_down(root, "ping-parent".to_string());
        assert_eq!(log_of(&log), vec!["root:down:ping-parent"]);
    }

    #[test]
    fn test_up_delivery_is_one_hop() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let mid = tree.attach(root, Probe::new("mid", &log)).unwrap();
        let leaf = tree.attach(mid, Probe::new("leaf", &log)).unwrap();
        log.lock().unwrap().clear();

        tree.send_down(leaf, "ping-parent".to_string());
        // mid hears it; root does not, because mid does not forward.
        assert_eq!(
            log_of(&log),
            vec!["leaf:down:ping-parent", "mid:up:pong"]
        );

        log.lock().unwrap().clear();
        tree.send_down(mid, "ping-parent".to_string());
        assert_eq!(log_of(&log), vec!["mid:down:ping-parent", "root:up:pong"]);
    }

    #[test]
    fn test_fan_out_in_child_order() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        tree.attach(root, Probe::new("a", &log)).unwrap();
        tree.attach(root, Probe::new("b", &log)).unwrap();
        tree.attach(root, Probe::new("c", &log)).unwrap();
        log.lock().unwrap().clear();

        tree.send_down(root, "fan".to_string());
        assert_eq!(
            log_of(&log),
            vec![
                "root:down:fan",
                "a:down:fan-out",
                "b:down:fan-out",
                "c:down:fan-out"
            ]
        );
    }

    #[test]
    fn test_down_to_non_child_is_dropped() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        let b = tree.attach(root, Probe::new("b", &log)).unwrap();

        // a and b are siblings; a may not message b directly.
        tree.get_mut::<Probe>(a).unwrap().cross_target = Some(b);
        log.lock().unwrap().clear();

        tree.send_down(a, "cross".to_string());
        assert_eq!(log_of(&log), vec!["a:down:cross"]);
    }

    #[test]
    fn test_self_removal_during_hook() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        tree.attach(a, Probe::new("inner", &log)).unwrap();
        log.lock().unwrap().clear();

        tree.send_down(a, "die".to_string());
        // Subtree torn down during the hook; a's own teardown deferred to
        // the end of the hook frame.
        assert_eq!(
            log_of(&log),
            vec!["a:down:die", "inner:removed", "a:removed"]
        );
        assert!(!tree.contains(a));
        assert_eq!(tree.len(), 1);
        assert!(tree.children_of(root).is_empty());
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_attach_and_greet_during_hook() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        log.lock().unwrap().clear();

        tree.send_down(root, "spawn".to_string());
        assert_eq!(
            log_of(&log),
            vec!["root:down:spawn", "spawned:attached", "spawned:down:hello"]
        );
        assert_eq!(tree.len(), 2);
        assert_links_consistent(&tree);
    }

    #[test]
    fn test_effects_are_drained_once() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        tree.send_down(root, "effect".to_string());

        assert_eq!(tree.take_effects(), vec!["root-effect".to_string()]);
        assert!(tree.take_effects().is_empty());
    }

    #[test]
    fn test_gesture_bubbles_until_consumed() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::consuming("root", &log)).unwrap();
        let mid = tree.attach(root, Probe::new("mid", &log)).unwrap();
        let leaf = tree.attach(mid, Probe::new("leaf", &log)).unwrap();
        tree.set_focus(leaf);
        log.lock().unwrap().clear();

        assert!(tree.dispatch_gesture(&'x'));
        assert_eq!(
            log_of(&log),
            vec!["leaf:gesture:x", "mid:gesture:x", "root:gesture:x"]
        );
    }

    #[test]
    fn test_gesture_unconsumed_returns_false() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        tree.set_focus(root);
        assert!(!tree.dispatch_gesture(&'x'));
    }

    #[test]
    fn test_timer_delivery() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        log.lock().unwrap().clear();

        tree.dispatch_timer(root, 3);
        assert_eq!(log_of(&log), vec!["root:timer:3"]);
    }

    #[test]
    fn test_links_consistent_through_mixed_operations() {
        let log = Log::default();
        let mut tree: Tree<TestProto> = Tree::new();
        let root = tree.attach_root(Probe::new("root", &log)).unwrap();
        let a = tree.attach(root, Probe::new("a", &log)).unwrap();
        let b = tree.attach(root, Probe::new("b", &log)).unwrap();
        let a1 = tree.attach(a, Probe::new("a1", &log)).unwrap();
        tree.attach(a, Probe::new("a2", &log)).unwrap();
        assert_links_consistent(&tree);

        tree.remove(a1);
        assert_links_consistent(&tree);

        let b1 = tree.attach(b, Probe::new("b1", &log)).unwrap();
        tree.remove(a);
        assert_links_consistent(&tree);

        tree.attach(b1, Probe::new("b1a", &log)).unwrap();
        tree.remove(b);
        assert_links_consistent(&tree);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.children_of(root), &[] as &[NodeId]);
    }
}
