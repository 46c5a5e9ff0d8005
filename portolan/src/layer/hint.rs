//! On-map hints nudging the user towards the supported gestures.

use std::any::Any;

use parking_lot::Mutex;
use portolan_types::cartesian::Point2;
use web_time::{Duration, SystemTime};

use crate::control::{ControlHint, MapEvent};
use crate::layer::{EventOutcome, Layer};
use crate::map::Map;
use crate::render::{Badge, Canvas, Color};

const HINT_DURATION: Duration = Duration::from_secs(2);

/// Layer that shows the most recent [`ControlHint`] for a short while.
///
/// The gesture controller emits hints instead of map mutations when a
/// gesture is deliberately not consumed (plain wheel scroll, single-finger
/// touch drag); this layer turns them into a transient badge near the
/// bottom of the viewport.
pub struct HintLayer {
    current: Mutex<Option<(ControlHint, SystemTime)>>,
    duration: Duration,
}

impl Default for HintLayer {
    fn default() -> Self {
        Self {
            current: Mutex::new(None),
            duration: HINT_DURATION,
        }
    }
}

impl HintLayer {
    /// Creates a hint layer with the default display duration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides how long a hint stays on the screen.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// User-facing text of the hint.
    pub fn message(hint: ControlHint) -> &'static str {
        match hint {
            ControlHint::UseCtrlToZoom => "Use Ctrl + scroll to zoom the map",
            ControlHint::UseTwoFingers => "Use two fingers to move the map",
        }
    }
}

impl Layer for HintLayer {
    fn on_redraw(&self, map: &Map, canvas: &mut dyn Canvas) {
        let mut current = self.current.lock();
        let Some((hint, shown_at)) = *current else {
            return;
        };

        let elapsed = SystemTime::now()
            .duration_since(shown_at)
            .unwrap_or_default();
        if elapsed >= self.duration {
            *current = None;
            return;
        }

        let size = canvas.size();
        canvas.draw_badge(Badge {
            position: Point2::new(size.half_width(), size.height() - 40.0),
            label: Self::message(hint).to_string(),
            color: Color::BLACK.with_alpha(180),
        });

        // One more frame after the hint expires clears it from the screen.
        map.request_redraw();
    }

    fn on_event(&self, event: &MapEvent, map: &Map) -> EventOutcome {
        match event {
            MapEvent::ControlHint(hint) => {
                *self.current.lock() = Some((*hint, SystemTime::now()));
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

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use portolan_types::cartesian::Size;
    use portolan_types::geo::Mercator;
    use portolan_types::latlon;

    use super::*;
    use crate::test_utils::RecordingCanvas;
    use crate::view::MapView;

    fn map() -> Map {
        let view = MapView::new(Arc::new(Mercator::default()), latlon!(0.0, 0.0), 1024.0)
            .with_size(Size::new(512.0, 512.0));
        Map::new(view, None)
    }

    #[test]
    fn hint_is_shown_after_the_event() {
        let mut map = map();
        let layer = Arc::new(HintLayer::new());
        map.register(layer.clone());

        map.emit(&MapEvent::ControlHint(ControlHint::UseCtrlToZoom));

        let mut canvas = RecordingCanvas::with_size(Size::new(512.0, 512.0));
        map.render(&mut canvas);

        assert_eq!(canvas.badges.len(), 1);
        assert_eq!(canvas.badges[0].label, HintLayer::message(ControlHint::UseCtrlToZoom));
        assert!(map.redraw_requested(), "hint display keeps the map animating");
    }

    #[test]
    fn expired_hint_is_dropped() {
        let mut map = map();
        let layer = Arc::new(HintLayer::new().with_duration(Duration::ZERO));
        map.register(layer.clone());

        map.emit(&MapEvent::ControlHint(ControlHint::UseTwoFingers));

        let mut canvas = RecordingCanvas::with_size(Size::new(512.0, 512.0));
        map.render(&mut canvas);

        assert!(canvas.badges.is_empty());
        assert!(layer.current.lock().is_none());
    }
}
