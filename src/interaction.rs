//! Who currently owns the viewport: the engine or the user
//!
//! [`InteractionTracker`] records whether the user has panned or zoomed
//! since the marker set last changed. While they have, the engine stops
//! auto-fitting and auto-centering. [`FocusSuppression`] briefly blocks
//! focus-marker recentring right after an explicit "go to" action.

use crate::{
    input::events::MapEvent,
    layers::marker::MarkerSignature,
    prelude::{Arc, Duration, Mutex},
    runtime::{self, AsyncHandle},
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionState {
    /// The engine may move the viewport on its own
    #[default]
    Idle,
    /// The user moved the map; automatic framing is off
    UserControlled,
}

/// Per-widget interaction flag plus the signature it was last reset for
#[derive(Debug, Default)]
pub struct InteractionTracker {
    state: InteractionState,
    signature: MarkerSignature,
}

impl InteractionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn is_user_controlled(&self) -> bool {
        self.state == InteractionState::UserControlled
    }

    pub fn mark_user_controlled(&mut self) {
        if self.state != InteractionState::UserControlled {
            log::debug!("viewport now user controlled");
        }
        self.state = InteractionState::UserControlled;
    }

    /// Feed a map event; drag-start and zoom changes hand control to the user.
    /// Returns whether the event was a user gesture.
    pub fn observe(&mut self, event: &MapEvent) -> bool {
        let gesture = event.is_user_gesture();
        if gesture {
            self.mark_user_controlled();
        }
        gesture
    }

    /// Record the current marker set. A changed set returns control to the
    /// engine unless `preserve_view` is requested. Returns whether the
    /// signature changed.
    pub fn sync_signature(&mut self, signature: MarkerSignature, preserve_view: bool) -> bool {
        if signature == self.signature {
            return false;
        }

        self.signature = signature;
        if !preserve_view && self.state != InteractionState::Idle {
            log::debug!("marker set changed; viewport back to idle");
            self.state = InteractionState::Idle;
        }
        true
    }

    pub fn signature(&self) -> &MarkerSignature {
        &self.signature
    }
}

/// Short-lived veto on focus recentring.
///
/// Engaging sets the flag and (re)starts a cooldown timer that clears it.
/// The timer runs on the async runtime independent of any render cycle, so
/// the flag cannot stay set.
pub struct FocusSuppression {
    active: Arc<AtomicBool>,
    epoch: Arc<AtomicU64>,
    timer: Mutex<Option<Box<dyn AsyncHandle>>>,
    cooldown: Duration,
}

impl FocusSuppression {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            epoch: Arc::new(AtomicU64::new(0)),
            timer: Mutex::new(None),
            cooldown,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Set the flag and restart the cooldown
    pub fn engage(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.active.store(true, Ordering::SeqCst);

        let active = self.active.clone();
        let current = self.epoch.clone();
        let cooldown = self.cooldown;
        let handle = runtime::spawn(async move {
            runtime::sleep(cooldown).await;
            if current.load(Ordering::SeqCst) == epoch {
                active.store(false, Ordering::SeqCst);
            }
        });

        if let Ok(mut timer) = self.timer.lock() {
            if let Some(previous) = timer.replace(handle) {
                previous.cancel();
            }
        }
    }

    /// Clear the flag now and stop the timer
    pub fn release(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.active.store(false, Ordering::SeqCst);
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.cancel();
            }
        }
    }
}

impl Drop for FocusSuppression {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::marker::MapMarker;

    fn signature(ids: &[&str]) -> MarkerSignature {
        let markers: Vec<_> = ids.iter().map(|id| MapMarker::new(*id)).collect();
        MarkerSignature::from_markers(&markers)
    }

    #[test]
    fn test_gestures_take_control() {
        let mut tracker = InteractionTracker::new();
        assert_eq!(tracker.state(), InteractionState::Idle);

        assert!(!tracker.observe(&MapEvent::Idle));
        assert_eq!(tracker.state(), InteractionState::Idle);

        assert!(tracker.observe(&MapEvent::ZoomChanged { level: 6 }));
        assert!(tracker.is_user_controlled());
    }

    #[test]
    fn test_same_signature_keeps_control() {
        let mut tracker = InteractionTracker::new();
        tracker.sync_signature(signature(&["a", "b"]), false);
        tracker.observe(&MapEvent::DragStart);

        assert!(!tracker.sync_signature(signature(&["a", "b"]), false));
        assert!(tracker.is_user_controlled());
    }

    #[test]
    fn test_new_signature_resets_unless_preserved() {
        let mut tracker = InteractionTracker::new();
        tracker.sync_signature(signature(&["a"]), false);
        tracker.observe(&MapEvent::DragStart);

        assert!(tracker.sync_signature(signature(&["a", "b"]), true));
        assert!(tracker.is_user_controlled());

        assert!(tracker.sync_signature(signature(&["c"]), false));
        assert_eq!(tracker.state(), InteractionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_suppression_clears_after_cooldown() {
        let suppression = FocusSuppression::new(Duration::from_millis(1000));
        assert!(!suppression.is_active());

        suppression.engage();
        assert!(suppression.is_active());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(suppression.is_active());

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!suppression.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reengage_restarts_cooldown() {
        let suppression = FocusSuppression::new(Duration::from_millis(1000));
        suppression.engage();

        tokio::time::sleep(Duration::from_millis(800)).await;
        suppression.engage();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(suppression.is_active());

        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!suppression.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_clears_immediately() {
        let suppression = FocusSuppression::new(Duration::from_secs(5));
        suppression.engage();
        suppression.release();
        assert!(!suppression.is_active());
    }
}
