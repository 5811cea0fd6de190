use crate::layers::manager::OverlayId;
use crate::prelude::{Arc, HashMap, Mutex};
use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::sync::Weak;

/// Notifications raised by the live map and the platform.
///
/// Hosts translate SDK / DOM callbacks into these and publish them on an
/// [`EventBus`]; the widget consumes them as plain state transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapEvent {
    /// The user started dragging the map
    DragStart,
    /// The user changed the zoom level (wheel, pinch or zoom control).
    ///
    /// Hosts forward only user-initiated zooms. The SDK also reports zoom
    /// changes caused by the widget's own `set_level` / `set_bounds` calls;
    /// those must not be published, since this event hands control to the
    /// user.
    ZoomChanged { level: i32 },
    /// The view settled after a move or zoom
    Idle,
    /// An overlay was clicked
    OverlayClicked { overlay: OverlayId },
    /// The platform reported a display-mode change
    FullscreenChanged { active: bool },
}

impl MapEvent {
    /// Whether this event means the user took manual control of the view
    pub fn is_user_gesture(&self) -> bool {
        matches!(self, MapEvent::DragStart | MapEvent::ZoomChanged { .. })
    }
}

#[derive(Default)]
struct BusInner {
    next_id: u64,
    listeners: HashMap<u64, Sender<MapEvent>>,
}

/// Fan-out channel for map and platform events.
///
/// Every [`Subscription`] gets its own queue; dropping the subscription
/// unsubscribes it.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<Mutex<BusInner>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new listener
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let mut id = 0;
        if let Ok(mut inner) = self.inner.lock() {
            id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, tx);
        }
        Subscription {
            id,
            receiver: rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every live listener
    pub fn emit(&self, event: MapEvent) {
        if let Ok(mut inner) = self.inner.lock() {
            inner
                .listeners
                .retain(|_, tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.inner.lock().map(|inner| inner.listeners.len()).unwrap_or(0)
    }
}

/// A registered listener. Unsubscribes on drop.
pub struct Subscription {
    id: u64,
    receiver: Receiver<MapEvent>,
    bus: Weak<Mutex<BusInner>>,
}

impl Subscription {
    /// Take every event queued so far, oldest first
    pub fn drain(&self) -> Vec<MapEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }

    /// Explicitly unsubscribe; equivalent to dropping
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            if let Ok(mut inner) = bus.lock() {
                inner.listeners.remove(&self.id);
            }
        }
    }
}
