//! Rendering abstraction consumed by map layers.
//!
//! Layers never talk to a GPU API directly. During a redraw each layer
//! receives a [`Canvas`] and records what it wants on the screen; the
//! backend decides how the primitives are actually painted. The crate ships
//! a [`wgpu`](self::wgpu) backend; tests use a recording canvas.

use std::sync::atomic::{AtomicU64, Ordering};

use portolan_types::cartesian::{Point2, Rect, Size};

use crate::decoded_image::DecodedImage;
use crate::error::PortolanError;
use crate::view::MapView;

#[cfg(feature = "wgpu")]
pub mod wgpu;

/// Color representation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    /// Transparent color: `#00000000`
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    /// White color: `#FFFFFFFF`
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    /// Black color: `#000000FF`
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);
    /// Gray color: `#AAAAAAFF`
    pub const GRAY: Color = Color::rgba(170, 170, 170, 255);
    /// Blue color: `#0000FFFF`
    pub const BLUE: Color = Color::rgba(0, 0, 255, 255);

    /// Constructs color from its RGBA channels.
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Returns the same color with a different alpha channel.
    pub const fn with_alpha(&self, a: u8) -> Self {
        Self { a, ..*self }
    }

    /// Converts the color into f32 array as used by GPU backends.
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }
}

static NEXT_POINT_SET_ID: AtomicU64 = AtomicU64::new(0);

/// A set of point-sprite positions in unit world space.
///
/// Positions are given in the zoom-independent `[0, 1]` square of the
/// projected world, so the same vertex data serves every viewport; backends
/// upload it to the GPU once per id and only the view matrix changes between
/// frames. Replacing the data means creating a new `PointSet` (and thus a
/// new id).
#[derive(Debug, Clone)]
pub struct PointSet {
    id: u64,
    positions: Vec<[f32; 2]>,
}

impl PointSet {
    /// Creates a point set with a fresh id.
    pub fn new(positions: Vec<[f32; 2]>) -> Self {
        Self {
            id: NEXT_POINT_SET_ID.fetch_add(1, Ordering::Relaxed),
            positions,
        }
    }

    /// Process-unique id of this data generation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Point positions in unit world space.
    pub fn positions(&self) -> &[[f32; 2]] {
        &self.positions
    }

    /// Number of points in the set.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// `true` if the set contains no points.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// How point sprites should be painted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointPaint {
    /// Fill color of the sprite.
    pub color: Color,
    /// Sprite diameter in physical pixels.
    pub size: f32,
}

/// A small screen-anchored marker with a text label.
///
/// Badges are not rasterized by the engine; backends collect them so the
/// host can present them with whatever label/tooltip machinery it has.
#[derive(Debug, Clone, PartialEq)]
pub struct Badge {
    /// Anchor position in physical pixels.
    pub position: Point2,
    /// Text of the badge.
    pub label: String,
    /// Badge color.
    pub color: Color,
}

/// Target the layers paint into during a redraw.
///
/// One frame is: [`Canvas::begin_frame`], then every layer's `on_redraw` in
/// registration order, then whatever the backend needs to submit the result.
/// Image coordinates are physical (device) pixels; point sprites are
/// positioned by the view matrix taken from the frame's [`MapView`].
pub trait Canvas {
    /// Size of the backing store in physical pixels.
    fn size(&self) -> Size;

    /// Starts a new frame for the given view, dropping anything recorded
    /// for the previous one.
    fn begin_frame(&mut self, view: &MapView);

    /// Draws the `source` rectangle of the image (in image pixels) into the
    /// `dest` rectangle of the canvas (in physical pixels).
    fn draw_image(&mut self, image: &DecodedImage, source: Rect, dest: Rect, opacity: f32);

    /// Draws all points of the set as circular sprites in a single call.
    fn draw_points(&mut self, set: &PointSet, paint: PointPaint) -> Result<(), PortolanError>;

    /// Records a badge for the host to present over the map.
    fn draw_badge(&mut self, badge: Badge);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_set_generations_get_new_ids() {
        let first = PointSet::new(vec![[0.5, 0.5]]);
        let second = PointSet::new(vec![[0.5, 0.5]]);
        assert_ne!(first.id(), second.id());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn color_to_f32() {
        assert_eq!(Color::BLACK.to_f32_array(), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(Color::WHITE.with_alpha(0).to_f32_array()[3], 0.0);
    }
}
