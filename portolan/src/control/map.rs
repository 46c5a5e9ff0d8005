use crate::control::{EventPropagation, MapEvent, UserEventHandler};
use crate::map::Map;

/// Stock event handler that pans and zooms the map.
///
/// Mouse drags pan, pinches zoom around the moving midpoint while following
/// it, and modifier-qualified wheel events start a smooth zoom. Everything
/// else is propagated untouched.
#[derive(Debug, Default, Copy, Clone)]
pub struct MapController;

impl UserEventHandler for MapController {
    fn handle(&self, event: &MapEvent, map: &mut Map) -> EventPropagation {
        match event {
            MapEvent::SingleMove {
                delta,
                panning: true,
                ..
            } => {
                // The content follows the pointer, so the camera moves the
                // opposite way.
                map.move_by(-*delta);
                EventPropagation::Stop
            }
            MapEvent::DoubleMove {
                pinch,
                midpoint_delta,
                zoom_ratio,
            } => {
                map.zoom_around(pinch.midpoint(), *zoom_ratio);
                map.move_by(-*midpoint_delta);
                EventPropagation::Stop
            }
            MapEvent::Wheel { position, factor } => {
                map.smooth_zoom_around(*position, *factor);
                EventPropagation::Stop
            }
            _ => EventPropagation::Propagate,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use approx::assert_abs_diff_eq;
    use portolan_types::cartesian::{Point2, Size};
    use portolan_types::geo::Mercator;
    use portolan_types::latlon;

    use super::*;
    use crate::control::{EventProcessor, RawUserEvent, TouchPoint, TouchState};
    use crate::test_utils::{CountingLayer, RecordingCanvas};
    use crate::view::MapView;

    fn map() -> Map {
        let view = MapView::new(Arc::new(Mercator::default()), latlon!(0.0, 0.0), 4096.0)
            .with_size(Size::new(512.0, 512.0));
        Map::new(view, None)
    }

    fn processor() -> EventProcessor {
        let mut processor = EventProcessor::default();
        processor.add_handler(MapController);
        processor
    }

    fn touch(id: u64, x: f64, y: f64) -> TouchPoint {
        TouchPoint {
            id,
            position: Point2::new(x, y),
        }
    }

    #[test]
    fn mouse_drag_moves_the_content_with_the_pointer() {
        let mut map = map();
        let mut processor = processor();
        let marker = map.view().screen_to_geo(Point2::new(100.0, 100.0));

        processor.handle(
            RawUserEvent::ButtonPressed(Point2::new(100.0, 100.0)),
            &mut map,
        );
        processor.handle(
            RawUserEvent::PointerMoved(Point2::new(150.0, 130.0)),
            &mut map,
        );

        let screen = map.view().geo_to_screen(&marker);
        assert_abs_diff_eq!(screen.x(), 150.0, epsilon = 1e-9);
        assert_abs_diff_eq!(screen.y(), 130.0, epsilon = 1e-9);
    }

    #[test]
    fn pinch_zooms_around_the_midpoint() {
        let mut map = map();
        let mut processor = processor();
        let start_zoom = map.view().zoom();

        let a = touch(1, 200.0, 256.0);
        let b = touch(2, 300.0, 256.0);
        processor.handle(RawUserEvent::TouchStart(TouchState::new(vec![a])), &mut map);
        processor.handle(
            RawUserEvent::TouchStart(TouchState::new(vec![a, b])),
            &mut map,
        );

        let midpoint = Point2::new(250.0, 256.0);
        let midpoint_geo = map.view().screen_to_geo(midpoint);

        processor.handle(
            RawUserEvent::TouchMove(TouchState::new(vec![
                touch(1, 150.0, 256.0),
                touch(2, 350.0, 256.0),
            ])),
            &mut map,
        );

        assert_abs_diff_eq!(map.view().zoom(), start_zoom * 2.0, epsilon = 1e-9);

        let after = map.view().screen_to_geo(midpoint);
        assert_abs_diff_eq!(after.lon(), midpoint_geo.lon(), epsilon = 1e-9);
        assert_abs_diff_eq!(after.lat(), midpoint_geo.lat(), epsilon = 1e-9);
    }

    #[test]
    fn modifier_wheel_starts_a_smooth_zoom() {
        let mut map = map();
        let mut processor = processor();
        let start_zoom = map.view().zoom();

        processor.handle(
            RawUserEvent::PointerMoved(Point2::new(256.0, 256.0)),
            &mut map,
        );
        processor.handle(
            RawUserEvent::Scroll {
                delta: -250.0,
                zoom_modifier: true,
            },
            &mut map,
        );

        assert_eq!(
            map.view().zoom(),
            start_zoom,
            "smooth zoom is applied over frames, not instantly"
        );

        let mut canvas = RecordingCanvas::default();
        while map.redraw_requested() {
            map.render(&mut canvas);
        }
        assert_abs_diff_eq!(map.view().zoom(), start_zoom * 2.0, epsilon = 1e-9);
    }

    #[test]
    fn gesture_events_are_multicast_to_layers() {
        let mut map = map();
        let layer = Arc::new(CountingLayer::default());
        map.register(layer.clone());

        let mut processor = processor();
        processor.handle(RawUserEvent::ButtonPressed(Point2::new(10.0, 10.0)), &mut map);
        processor.handle(RawUserEvent::PointerMoved(Point2::new(20.0, 10.0)), &mut map);

        let events = layer.events();
        assert!(matches!(events[0], MapEvent::SingleDown(_)));
        // The pan is applied (and its Moved event emitted) before the move
        // event itself reaches the layers.
        assert!(events.contains(&MapEvent::Moved));
        assert!(matches!(events.last(), Some(MapEvent::SingleMove { .. })));
    }
}
