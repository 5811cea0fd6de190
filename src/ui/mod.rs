pub mod widget;

pub use widget::{
    CycleRequest, CycleToken, MapWidget, MountOutcome, ResolvedCycle, WidgetCallbacks,
    WidgetError, WidgetProps,
};
