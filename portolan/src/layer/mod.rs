//! Layers paint the actual content of the map.
//!
//! A layer is anything registered with [`Map::register`](crate::map::Map::register).
//! The map keeps layers in registration order, and that order is both the
//! paint order and the event dispatch order. The trait is sparse on purpose:
//! a layer implements only the callbacks it cares about, everything else
//! defaults to a no-op.

use std::any::Any;

use crate::control::MapEvent;
use crate::map::Map;
use crate::render::Canvas;

pub mod hint;
pub mod points;
pub mod tile_layer;

pub use hint::HintLayer;
pub use points::PointsLayer;
pub use tile_layer::TileLayer;

/// Result of delivering an event to a layer.
///
/// Events are multicast: every registered layer receives every event
/// regardless of what earlier layers returned. The outcome is informational
/// only.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// The layer did not react to the event.
    Ignored,
    /// The layer reacted to the event.
    Handled,
}

/// A single drawable (and optionally interactive) element of the map.
///
/// All methods take `&self`: layers own their mutable state behind interior
/// mutability and must never change the map view except through the map's
/// public methods.
pub trait Layer: Send + Sync {
    /// Called synchronously when the layer is registered with a map.
    fn on_register(&self, map: &Map) {
        let _ = map;
    }

    /// Called synchronously when the layer is removed from a map.
    fn on_unregister(&self, map: &Map) {
        let _ = map;
    }

    /// Called once per rendered frame, before any layer is painted. This is
    /// the place for data preparation that should not happen during paint,
    /// such as scheduling tile downloads.
    fn on_update(&self, map: &Map) {
        let _ = map;
    }

    /// Paints the layer for the current frame.
    fn on_redraw(&self, map: &Map, canvas: &mut dyn Canvas);

    /// Receives map and gesture events.
    fn on_event(&self, event: &MapEvent, map: &Map) -> EventOutcome {
        let _ = (event, map);
        EventOutcome::Ignored
    }

    /// A map stores layers as trait objects. This method can be used to
    /// convert the trait object back into the concrete type.
    fn as_any(&self) -> &dyn Any;
}
