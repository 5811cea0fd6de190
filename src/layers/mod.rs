pub mod manager;
pub mod marker;

pub use manager::{OverlayId, OverlayKind, OverlayManager, OverlaySpec};
pub use marker::{MapMarker, MarkerSignature, ResolvedMarker};
