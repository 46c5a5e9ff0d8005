//! User interaction handling for the map.
//!
//! Interaction is processed in several steps:
//! 1. The host converts its native input events (DOM, winit, ...) into the
//!    common [`RawUserEvent`] enum, with all positions already relative to
//!    the map viewport. That conversion is the only platform-specific part
//!    and lives outside of this crate.
//! 2. The [`EventProcessor`] runs raw events through a small gesture state
//!    machine (idle / dragging / pinching) and produces [`MapEvent`]s,
//!    synthesizing hand-off events when pointers come and go mid-gesture.
//! 3. Each produced event is offered to the registered
//!    [`UserEventHandler`]s in order ([`MapController`] is the stock one
//!    that pans and zooms the map), and is then multicast to every map
//!    layer via [`Map::emit`](crate::map::Map::emit).

use portolan_types::cartesian::{Point2, Vector2};

use crate::map::Map;

mod event_processor;
mod map;

pub use event_processor::EventProcessor;
pub use map::MapController;

/// Raw user interaction event, pre-normalized by the host.
///
/// Positions are logical pixels relative to the top-left corner of the map
/// viewport. Touch events carry the full list of touches that remain active
/// after the event, mirroring what browsers and mobile platforms report;
/// the gesture state is reconstructed by the [`EventProcessor`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawUserEvent {
    /// Primary mouse button was pressed.
    ButtonPressed(Point2),
    /// Primary mouse button was released.
    ButtonReleased(Point2),
    /// Mouse pointer moved to the given position.
    PointerMoved(Point2),
    /// Mouse wheel or touchpad scroll.
    Scroll {
        /// Vertical scroll delta in abstract wheel units.
        delta: f64,
        /// Whether the zoom modifier key (Ctrl/Cmd) was held.
        zoom_modifier: bool,
    },
    /// A new touch appeared.
    TouchStart(TouchState),
    /// One or more touches moved.
    TouchMove(TouchState),
    /// One or more touches ended; the state lists the survivors.
    TouchEnd(TouchState),
}

/// Id of a touch, unique while the touch is active.
pub type TouchId = u64;

/// A single active touch point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    /// Id of the touch.
    pub id: TouchId,
    /// Position of the touch relative to the map viewport.
    pub position: Point2,
}

/// The set of active touches after an event.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TouchState {
    touches: Vec<TouchPoint>,
}

impl TouchState {
    /// Creates a touch state from the list of active touches.
    pub fn new(touches: Vec<TouchPoint>) -> Self {
        Self { touches }
    }

    /// Active touches in platform order.
    pub fn touches(&self) -> &[TouchPoint] {
        &self.touches
    }

    fn get(&self, id: TouchId) -> Option<TouchPoint> {
        self.touches.iter().copied().find(|touch| touch.id == id)
    }
}

/// State of a single pointer at the moment of an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    /// Pointer position relative to the map viewport.
    pub position: Point2,
    /// `true` when the event was synthesized for a gesture hand-off (a
    /// second finger joining or leaving) rather than a physical
    /// press/release.
    pub switching: bool,
    /// `true` for mouse pointers, `false` for touches.
    pub from_mouse: bool,
}

/// State of a two-finger gesture at the moment of an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinchEvent {
    /// Position of the first touch.
    pub first: Point2,
    /// Position of the second touch.
    pub second: Point2,
}

impl PinchEvent {
    /// Point in the middle between the two touches.
    pub fn midpoint(&self) -> Point2 {
        self.first.midpoint(&self.second)
    }

    /// Distance between the two touches.
    pub fn distance(&self) -> f64 {
        self.first.distance(&self.second)
    }
}

/// Discoverability hints emitted instead of map mutations for gestures the
/// map deliberately does not consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlHint {
    /// An unmodified wheel scroll was received; zooming needs Ctrl/Cmd.
    UseCtrlToZoom,
    /// A single-finger drag was received; panning needs two fingers.
    UseTwoFingers,
}

/// Event produced by the [`EventProcessor`] and multicast to map layers.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A single pointer went down.
    SingleDown(PointerEvent),
    /// A single pointer moved.
    SingleMove {
        /// The pointer state.
        pointer: PointerEvent,
        /// Movement since the last reported position.
        delta: Vector2,
        /// `true` when this movement should pan the map (mouse drag).
        panning: bool,
    },
    /// A single pointer went up.
    SingleUp(PointerEvent),
    /// A second touch joined; a pinch begins.
    DoubleDown(PinchEvent),
    /// One or both touches of a pinch moved.
    DoubleMove {
        /// The pinch state after the movement.
        pinch: PinchEvent,
        /// Movement of the pinch midpoint since the last event.
        midpoint_delta: Vector2,
        /// Ratio of the new to the previous distance between the touches.
        zoom_ratio: f64,
    },
    /// The pinch ended.
    DoubleUp(PinchEvent),
    /// A modifier-qualified wheel scroll asking for a smooth zoom.
    Wheel {
        /// Zoom pivot (the pointer position).
        position: Point2,
        /// Multiplicative zoom factor.
        factor: f64,
    },
    /// A discoverability hint.
    ControlHint(ControlHint),
    /// The map view was panned.
    Moved,
    /// The map view was zoomed.
    Zoomed,
}

/// Value returned by a [`UserEventHandler`] to indicate what should happen
/// to the event next.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventPropagation {
    /// Offer the event to the next handler.
    Propagate,
    /// Do not offer the event to further handlers. Layers still receive it
    /// through the multicast dispatch.
    Stop,
}

/// User input handler invoked by the [`EventProcessor`] before the event is
/// multicast to layers. Handlers are the only place that may mutate the map
/// in response to input.
pub trait UserEventHandler {
    /// Handle the event.
    fn handle(&self, event: &MapEvent, map: &mut Map) -> EventPropagation;
}

impl<T> UserEventHandler for T
where
    T: for<'a> Fn(&'a MapEvent, &'a mut Map) -> EventPropagation,
{
    fn handle(&self, event: &MapEvent, map: &mut Map) -> EventPropagation {
        self(event, map)
    }
}
