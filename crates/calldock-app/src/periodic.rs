//! Periodic tick delivery for element timers.
//!
//! Elements request timers through `Effect::StartTimer`; the shell owns the
//! actual tasks. Each job is keyed by `(node, timer)` so a node's timers die
//! with it and restarting a timer replaces the previous cadence.

use std::collections::HashMap;
use std::time::Duration;

use calldock_core::tree::NodeId;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use calldock_core::prelude::*;

use crate::message::TimerId;
use crate::widget::WidgetInput;

/// A spawned interval task feeding `WidgetInput::Timer` into the shell.
struct PeriodicJob {
    handle: JoinHandle<()>,
}

impl PeriodicJob {
    fn spawn(
        tx: UnboundedSender<WidgetInput>,
        node: NodeId,
        timer: TimerId,
        period: Duration,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately; the cadence starts after.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(WidgetInput::Timer(node, timer)).is_err() {
                    return;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for PeriodicJob {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// All running timers, keyed by owning node and timer id.
pub struct TimerRegistry {
    jobs: HashMap<(NodeId, TimerId), PeriodicJob>,
    tx: UnboundedSender<WidgetInput>,
}

impl TimerRegistry {
    pub fn new(tx: UnboundedSender<WidgetInput>) -> Self {
        Self {
            jobs: HashMap::new(),
            tx,
        }
    }

    /// Start (or restart) a timer. An existing job under the same key is
    /// aborted and replaced.
    pub fn start(&mut self, node: NodeId, timer: TimerId, period: Duration) {
        trace!(?node, ?timer, ?period, "starting timer");
        let job = PeriodicJob::spawn(self.tx.clone(), node, timer, period);
        self.jobs.insert((node, timer), job);
    }

    pub fn stop(&mut self, node: NodeId, timer: TimerId) {
        if self.jobs.remove(&(node, timer)).is_some() {
            trace!(?node, ?timer, "stopped timer");
        }
    }

    /// Stop every timer a node owns. Called when the node leaves the tree.
    pub fn stop_node(&mut self, node: NodeId) {
        self.jobs.retain(|(owner, _), _| *owner != node);
    }

    pub fn stop_all(&mut self) {
        self.jobs.clear();
    }

    pub fn is_running(&self, node: NodeId, timer: TimerId) -> bool {
        self.jobs.contains_key(&(node, timer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    use crate::elements::testing::Host;
    use crate::message::CalldockProtocol;

    /// Real node ids, minted from a scratch tree.
    fn nodes() -> (NodeId, NodeId) {
        let mut tree: calldock_core::tree::Tree<CalldockProtocol> =
            calldock_core::tree::Tree::new();
        let root = tree.attach_root(Host::boxed()).unwrap();
        let child = tree.attach(root, Host::boxed()).unwrap();
        (root, child)
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_arrive_on_cadence() {
        let (root, _child) = nodes();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerRegistry::new(tx);
        timers.start(root, TimerId::CallTicker, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        let mut ticks = 0;
        while let Ok(input) = rx.try_recv() {
            assert!(matches!(
                input,
                WidgetInput::Timer(n, TimerId::CallTicker) if n == root
            ));
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_ends_delivery() {
        let (root, _child) = nodes();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerRegistry::new(tx);
        timers.start(root, TimerId::StatusRotator, Duration::from_secs(1));
        assert!(timers.is_running(root, TimerId::StatusRotator));

        timers.stop(root, TimerId::StatusRotator);
        assert!(!timers.is_running(root, TimerId::StatusRotator));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_node_clears_all_of_its_timers() {
        let (root, child) = nodes();
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = TimerRegistry::new(tx);
        timers.start(root, TimerId::CallTicker, Duration::from_secs(1));
        timers.start(root, TimerId::StatusRotator, Duration::from_secs(2));
        timers.start(child, TimerId::ToastTtl, Duration::from_secs(3));

        timers.stop_node(root);
        assert!(!timers.is_running(root, TimerId::CallTicker));
        assert!(!timers.is_running(root, TimerId::StatusRotator));
        assert!(timers.is_running(child, TimerId::ToastTtl));
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_cadence() {
        let (root, _child) = nodes();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = TimerRegistry::new(tx);
        timers.start(root, TimerId::CallTicker, Duration::from_secs(10));
        timers.start(root, TimerId::CallTicker, Duration::from_secs(1));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(rx.try_recv().is_ok());
    }
}
