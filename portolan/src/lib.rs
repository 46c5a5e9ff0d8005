//! Portolan is a minimal slippy-map engine: raster tile layers, touch and
//! mouse gestures, and a GPU-rendered point overlay over an infinite
//! projected plane.
//!
//! # Main components
//!
//! Everything revolves around
//!
//! * the [`Map`] struct, which owns the currently displayed [`MapView`]
//!   and an ordered set of
//! * [`layers`](layer) that paint the actual content: [`TileLayer`](layer::TileLayer)
//!   blits raster tiles with coarser/finer placeholders while the exact
//!   ones load, [`PointsLayer`](layer::PointsLayer) draws a scatter of
//!   geographic points as GPU sprites, and [`HintLayer`](layer::HintLayer)
//!   surfaces gesture discoverability hints. Layers paint through the
//! * [`Canvas`](render::Canvas) abstraction, implemented for `wgpu` in
//!   [`render::wgpu`].
//!
//! The map does not own a display loop. It asks the injected
//! [`Messenger`] for a frame whenever something changed, and the host calls
//! [`Map::render`] on its next animation frame; redundant requests within
//! one frame collapse into a single repaint. This keeps the engine fully
//! driveable from tests.
//!
//! User input arrives pre-normalized as
//! [`RawUserEvent`](control::RawUserEvent)s and is converted by the
//! [`EventProcessor`](control::EventProcessor) gesture state machine into
//! pan/zoom intents (applied by the [`MapController`](control::MapController))
//! and into events multicast to the layers.
//!
//! Geographic math lives in the [`portolan_types`] crate; the engine only
//! requires the five-method [`Projection`](portolan_types::geo::Projection)
//! capability set, so Mercator, elliptical Mercator and flat projections
//! are interchangeable.

pub(crate) mod async_runtime;
pub mod control;
pub mod decoded_image;
pub mod error;
pub mod layer;
pub mod map;
mod messenger;
pub mod render;
mod view;

#[cfg(test)]
pub(crate) mod test_utils;

pub use decoded_image::DecodedImage;
pub use error::PortolanError;
pub use map::{LayerCollection, Map};
pub use messenger::{DummyMessenger, Messenger};
pub use render::Color;
pub use view::MapView;

// Reexport portolan_types
pub use portolan_types;
