//! Geometry primitives and projections used by the `portolan` map engine.
//!
//! The crate is split in two coordinate worlds:
//!
//! * [`cartesian`] - points, vectors and rectangles in pixel space;
//! * [`geo`] - geographic coordinates and the [`Projection`](geo::Projection)
//!   capability set that converts between the two.
//!
//! The engine depends only on the traits defined here, never on a concrete
//! projection, so any type implementing [`geo::Projection`] can be plugged in.

pub mod cartesian;
pub mod geo;
