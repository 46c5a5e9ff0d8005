//! GPU-rendered scatter overlay for geographic point data.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use portolan_types::cartesian::Point2;
use portolan_types::geo::Projection;

use crate::control::MapEvent;
use crate::layer::{EventOutcome, Layer};
use crate::map::Map;
use crate::messenger::Messenger;
use crate::render::{Badge, Canvas, Color, PointPaint, PointSet};

/// Amplitude of the ingestion jitter in degrees.
const JITTER_DEGREES: f64 = 0.1;

/// Radius of the hover circle in logical pixels.
const HOVER_RADIUS_PX: f64 = 12.0;

/// Screen offset of the hover badge from the pointer, in logical pixels.
const BADGE_OFFSET_PX: f64 = 14.0;

/// Layer that draws an array of `(lon, lat)` points as circular sprites.
///
/// Point data is projected into unit world space once when it is supplied,
/// so render backends can keep it on the GPU as a single vertex buffer and
/// redraw the whole set with one call per frame; only the view matrix
/// changes while the map moves. A small deterministic jitter is applied at
/// ingestion so exactly co-located points do not collapse into one sprite.
///
/// The layer also tracks the mouse pointer and shows a badge with the
/// number of points inside a small circle around it.
pub struct PointsLayer {
    projection: Arc<dyn Projection>,
    color: Color,
    points: RwLock<PointSet>,
    spread: RwLock<Vec<(f64, f64)>>,
    hover: Mutex<Option<Point2>>,
    messenger: Mutex<Option<Arc<dyn Messenger>>>,
    disabled: AtomicBool,
}

impl PointsLayer {
    /// Creates an empty layer projecting points with the given projection.
    ///
    /// The projection must be the one the map itself uses, otherwise the
    /// sprites will not line up with the tiles.
    pub fn new(projection: Arc<dyn Projection>) -> Self {
        Self {
            projection,
            color: Color::rgba(28, 119, 255, 230),
            points: RwLock::new(PointSet::new(vec![])),
            spread: RwLock::new(vec![]),
            hover: Mutex::new(None),
            messenger: Mutex::new(None),
            disabled: AtomicBool::new(false),
        }
    }

    /// Overrides the sprite color.
    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    /// Replaces the displayed data set with the given `[lon, lat]` pairs.
    ///
    /// May be called at any time, including before the layer is registered;
    /// the uploaded GPU buffer is replaced on the next frame.
    pub fn set_locations(&self, locations: &[[f64; 2]]) {
        let mut spread = Vec::with_capacity(locations.len());
        let mut positions = Vec::with_capacity(locations.len());

        for (index, [lon, lat]) in locations.iter().enumerate() {
            let lon = lon + jitter(index as u64 * 2) * JITTER_DEGREES;
            let lat = lat + jitter(index as u64 * 2 + 1) * JITTER_DEGREES;

            spread.push((lon, lat));
            positions.push([
                self.projection.lon_to_x(lon, 1.0) as f32,
                self.projection.lat_to_y(lat, 1.0) as f32,
            ]);
        }

        *self.spread.write() = spread;
        *self.points.write() = PointSet::new(positions);

        if let Some(messenger) = self.messenger.lock().clone() {
            messenger.request_redraw();
        }
    }

    /// Number of displayed points.
    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    /// `true` if the layer has no data.
    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    /// Sprite diameter in physical pixels for the given view.
    fn point_size(map: &Map) -> f32 {
        let view = map.view();
        let size = (view.zoom().log2() - 6.0) * 1.5;
        (size * view.dpi_scale()) as f32
    }

    /// Counts the points within the hover circle around the given screen
    /// position.
    ///
    /// The circle is converted into an ellipse in degree space: the
    /// semiaxes are the longitude and latitude spans of the pixel radius at
    /// the pointer's position, which keeps the test cheap while matching
    /// what the user sees on the screen.
    pub fn hover_count(&self, map: &Map, position: Point2) -> usize {
        let view = map.view();
        let center = view.screen_to_geo(position);
        let zoom = view.zoom();

        let world = view.geo_to_world(&center);
        let lon_radius =
            (self.projection.x_to_lon(world.x() + HOVER_RADIUS_PX, zoom) - center.lon()).abs();
        let lat_radius =
            (self.projection.y_to_lat(world.y() + HOVER_RADIUS_PX, zoom) - center.lat()).abs();
        if lon_radius == 0.0 || lat_radius == 0.0 {
            return 0;
        }

        self.spread
            .read()
            .iter()
            .filter(|(lon, lat)| {
                let dx = (lon - center.lon()) / lon_radius;
                let dy = (lat - center.lat()) / lat_radius;
                dx * dx + dy * dy <= 1.0
            })
            .count()
    }
}

impl Layer for PointsLayer {
    fn on_register(&self, map: &Map) {
        *self.messenger.lock() = map.messenger();
    }

    fn on_unregister(&self, _map: &Map) {
        *self.messenger.lock() = None;
        *self.hover.lock() = None;
    }

    fn on_redraw(&self, map: &Map, canvas: &mut dyn Canvas) {
        if self.disabled.load(Ordering::Acquire) {
            return;
        }

        let points = self.points.read();
        if !points.is_empty() {
            let paint = PointPaint {
                color: self.color,
                size: Self::point_size(map).clamp(4.0, 24.0),
            };

            if let Err(error) = canvas.draw_points(&points, paint) {
                if !self.disabled.swap(true, Ordering::AcqRel) {
                    log::error!("points overlay disabled: {error}");
                }
                return;
            }
        }
        drop(points);

        if let Some(position) = *self.hover.lock() {
            let count = self.hover_count(map, position);
            if count > 0 {
                let dpi = map.view().dpi_scale();
                canvas.draw_badge(Badge {
                    position: Point2::new(
                        (position.x() + BADGE_OFFSET_PX) * dpi,
                        (position.y() - BADGE_OFFSET_PX) * dpi,
                    ),
                    label: count.to_string(),
                    color: self.color,
                });
            }
        }
    }

    fn on_event(&self, event: &MapEvent, map: &Map) -> EventOutcome {
        match event {
            MapEvent::SingleMove { pointer, .. } if pointer.from_mouse => {
                *self.hover.lock() = Some(pointer.position);
                map.request_redraw();
                EventOutcome::Handled
            }
            _ => EventOutcome::Ignored,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Deterministic pseudo-random value in `[-0.5, 0.5)` derived from the
/// seed (splitmix64 finalizer).
fn jitter(seed: u64) -> f64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;

    (z >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

#[cfg(test)]
mod tests {
    use portolan_types::cartesian::Size;
    use portolan_types::geo::Mercator;
    use portolan_types::latlon;

    use super::*;
    use crate::control::PointerEvent;
    use crate::test_utils::RecordingCanvas;
    use crate::view::MapView;

    fn projection() -> Arc<dyn Projection> {
        Arc::new(Mercator::default())
    }

    fn map() -> Map {
        let view = MapView::new(projection(), latlon!(0.0, 0.0), 1024.0)
            .with_size(Size::new(512.0, 512.0));
        Map::new(view, None)
    }

    #[test]
    fn ingestion_is_deterministic() {
        let layer = PointsLayer::new(projection());
        let data = [[13.4, 52.5], [13.4, 52.5], [-70.0, -33.5]];

        layer.set_locations(&data);
        let first = layer.points.read().positions().to_vec();

        layer.set_locations(&data);
        let second = layer.points.read().positions().to_vec();

        assert_eq!(first, second);
    }

    #[test]
    fn jitter_separates_colocated_points() {
        let layer = PointsLayer::new(projection());
        layer.set_locations(&[[13.4, 52.5], [13.4, 52.5]]);

        let points = layer.points.read();
        assert_ne!(points.positions()[0], points.positions()[1]);
    }

    #[test]
    fn hover_counts_points_under_the_pointer() {
        let map = map();
        let layer = PointsLayer::new(projection());
        // Two points at the view center, one on the other side of the
        // world.
        layer.set_locations(&[[0.0, 0.0], [0.0, 0.0], [120.0, 45.0]]);

        let count = layer.hover_count(&map, Point2::new(256.0, 256.0));
        assert_eq!(count, 2);

        let count = layer.hover_count(&map, Point2::new(10.0, 10.0));
        assert_eq!(count, 0);
    }

    #[test]
    fn hover_draws_a_count_badge() {
        let mut map = map();
        let layer = Arc::new(PointsLayer::new(projection()));
        layer.set_locations(&[[0.0, 0.0]]);
        map.register(layer.clone());

        layer.on_event(
            &MapEvent::SingleMove {
                pointer: PointerEvent {
                    position: Point2::new(256.0, 256.0),
                    switching: false,
                    from_mouse: true,
                },
                delta: Default::default(),
                panning: false,
            },
            &map,
        );

        let mut canvas = RecordingCanvas::with_size(Size::new(512.0, 512.0));
        map.render(&mut canvas);

        assert_eq!(canvas.point_draws(), 1);
        assert_eq!(canvas.badges.len(), 1);
        assert_eq!(canvas.badges[0].label, "1");
    }

    #[test]
    fn render_failure_disables_the_overlay() {
        let mut map = map();
        let layer = Arc::new(PointsLayer::new(projection()));
        layer.set_locations(&[[0.0, 0.0]]);
        map.register(layer.clone());

        let mut failing = RecordingCanvas::with_size(Size::new(512.0, 512.0));
        failing.fail_points = true;
        map.render(&mut failing);

        // A working canvas afterwards still gets nothing: the overlay
        // disabled itself.
        let mut canvas = RecordingCanvas::with_size(Size::new(512.0, 512.0));
        map.request_redraw();
        map.render(&mut canvas);
        assert_eq!(canvas.point_draws(), 0);
    }

    #[test]
    fn new_data_generation_gets_a_new_buffer_id() {
        let layer = PointsLayer::new(projection());
        layer.set_locations(&[[0.0, 0.0]]);
        let first = layer.points.read().id();
        layer.set_locations(&[[0.0, 0.0]]);
        let second = layer.points.read().id();
        assert_ne!(first, second);
    }
}
