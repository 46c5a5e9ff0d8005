//! Current state of the map viewport.

use std::sync::Arc;

use nalgebra::Matrix4;
use portolan_types::cartesian::{Point2, Size, Vector2};
use portolan_types::geo::{GeoPoint2d, Projection};

/// Immutable snapshot of the map camera.
///
/// The camera is defined by the geographic `center`, the `zoom` (the number
/// of pixels the whole projected world spans) and the viewport `size` in
/// logical pixels. The pixel shift of the viewport is the derived second
/// representation of the same position: mutating the center through any of
/// the `with_*`/translation methods keeps both in sync by construction.
///
/// Mutation happens only inside [`Map`](crate::map::Map); layers read the
/// current snapshot during their callbacks.
#[derive(Clone)]
pub struct MapView {
    center: GeoPoint2d,
    zoom: f64,
    size: Size,
    dpi_scale: f64,
    projection: Arc<dyn Projection>,
}

impl std::fmt::Debug for MapView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapView")
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("size", &self.size)
            .field("dpi_scale", &self.dpi_scale)
            .finish()
    }
}

impl MapView {
    /// Creates a new view.
    pub fn new(projection: Arc<dyn Projection>, center: GeoPoint2d, zoom: f64) -> Self {
        Self {
            center,
            zoom,
            size: Size::default(),
            dpi_scale: 1.0,
            projection,
        }
    }

    /// Geographic center of the viewport.
    pub fn center(&self) -> GeoPoint2d {
        self.center
    }

    /// Number of pixels the whole world spans at the current scale.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Continuous zoom level: `log2` of the zoom. Integer values are the
    /// levels of the tile pyramid grid.
    pub fn continuous_level(&self) -> f64 {
        self.zoom.log2()
    }

    /// Size of the viewport in logical pixels.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Ratio of physical to logical pixels of the output surface.
    pub fn dpi_scale(&self) -> f64 {
        self.dpi_scale
    }

    /// Projection the view operates in.
    pub fn projection(&self) -> &Arc<dyn Projection> {
        &self.projection
    }

    /// Returns the same view with a different center.
    pub fn with_center(&self, center: GeoPoint2d) -> Self {
        Self {
            center,
            ..self.clone()
        }
    }

    /// Returns the same view with a different zoom.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self {
            zoom,
            ..self.clone()
        }
    }

    /// Returns the same view with a different viewport size.
    pub fn with_size(&self, size: Size) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Returns the same view with a different DPI scale factor.
    pub fn with_dpi_scale(&self, dpi_scale: f64) -> Self {
        Self {
            dpi_scale,
            ..self.clone()
        }
    }

    /// Screen position of the viewport center.
    pub fn screen_center(&self) -> Point2 {
        Point2::new(self.size.half_width(), self.size.half_height())
    }

    /// Projects a geographic point into world pixel coordinates at the
    /// current zoom.
    pub fn geo_to_world(&self, point: &GeoPoint2d) -> Point2 {
        Point2::new(
            self.projection.lon_to_x(point.lon(), self.zoom),
            self.projection.lat_to_y(point.lat(), self.zoom),
        )
    }

    /// Unprojects world pixel coordinates back into a geographic point.
    pub fn world_to_geo(&self, point: Point2) -> GeoPoint2d {
        GeoPoint2d::latlon(
            self.projection.y_to_lat(point.y(), self.zoom),
            self.projection.x_to_lon(point.x(), self.zoom),
        )
    }

    /// World pixel coordinates of the top-left corner of the viewport.
    pub fn pixel_origin(&self) -> Point2 {
        let center = self.geo_to_world(&self.center);
        Point2::new(
            center.x() - self.size.half_width(),
            center.y() - self.size.half_height(),
        )
    }

    /// Pixel-shift representation of the camera position.
    ///
    /// This is the displacement of the viewport's top-left corner from the
    /// world origin; together with [`MapView::center`] these are two views
    /// of the same state.
    pub fn pixel_shift(&self) -> Vector2 {
        self.pixel_origin() - Point2::new(0.0, 0.0)
    }

    /// Converts a geographic point into viewport coordinates in logical
    /// pixels.
    pub fn geo_to_screen(&self, point: &GeoPoint2d) -> Point2 {
        let world = self.geo_to_world(point);
        let origin = self.pixel_origin();
        Point2::new(world.x() - origin.x(), world.y() - origin.y())
    }

    /// Converts viewport coordinates in logical pixels into a geographic
    /// point.
    pub fn screen_to_geo(&self, point: Point2) -> GeoPoint2d {
        let origin = self.pixel_origin();
        self.world_to_geo(Point2::new(
            origin.x() + point.x(),
            origin.y() + point.y(),
        ))
    }

    /// Moves the camera by the given number of screen pixels.
    pub fn translated_by_px(&self, delta: Vector2) -> Self {
        let center = self.geo_to_world(&self.center) + delta;
        self.with_center(self.world_to_geo(center))
    }

    /// Changes the zoom so that the geographic point currently under the
    /// `pivot` screen position stays exactly under it.
    pub fn zoomed_around(&self, pivot: Point2, new_zoom: f64) -> Self {
        let pivot_geo = self.screen_to_geo(pivot);

        let zoomed = self.with_zoom(new_zoom);
        let pivot_world = zoomed.geo_to_world(&pivot_geo);
        let center_world = Point2::new(
            pivot_world.x() - (pivot.x() - self.size.half_width()),
            pivot_world.y() - (pivot.y() - self.size.half_height()),
        );

        zoomed.with_center(zoomed.world_to_geo(center_world))
    }

    /// Transformation matrix from unit world space (the `[0, 1]` square of
    /// the projected world) into clip space of the current viewport.
    ///
    /// Column-major, ready to be uploaded into a GPU uniform.
    pub fn unit_to_clip_mtx(&self) -> [[f32; 4]; 4] {
        let width = self.size.width();
        let height = self.size.height();
        if self.size.is_zero() {
            return Matrix4::<f64>::identity().cast::<f32>().data.0;
        }

        let origin = self.pixel_origin();
        let sx = 2.0 * self.zoom / width;
        let tx = -(2.0 * origin.x() / width + 1.0);
        let sy = -2.0 * self.zoom / height;
        let ty = 2.0 * origin.y() / height + 1.0;

        #[rustfmt::skip]
        let matrix = Matrix4::new(
            sx, 0.0, 0.0, tx,
            0.0, sy, 0.0, ty,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );

        matrix.cast::<f32>().data.0
    }
}
