use portolan_types::cartesian::{Point2, Vector2};
use web_time::{Duration, SystemTime};

use crate::control::{
    ControlHint, EventPropagation, MapEvent, PinchEvent, PointerEvent, RawUserEvent, TouchId,
    TouchPoint, TouchState, UserEventHandler,
};
use crate::map::Map;

/// Zoom factor for one wheel unit with the zoom modifier held is
/// `2^(-delta / WHEEL_ZOOM_DIVISOR)`.
const WHEEL_ZOOM_DIVISOR: f64 = 250.0;

/// Minimum pause between two-finger hints, and after the end of a pinch
/// before the hint may appear again.
const TOUCH_HINT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq)]
enum GestureState {
    Idle,
    Dragging {
        /// `None` when the gesture is driven by the mouse.
        touch: Option<TouchId>,
        position: Point2,
    },
    Pinching {
        first: TouchPoint,
        second: TouchPoint,
    },
}

/// Translates [`RawUserEvent`]s into [`MapEvent`]s and dispatches them.
///
/// The processor owns the gesture state machine. It distinguishes mouse
/// drags from one- and two-finger touch gestures, synthesizes hand-off
/// events (flagged `switching`) when the pointer count changes mid-gesture,
/// and turns deliberately unconsumed gestures into [`ControlHint`]s.
///
/// Produced events first go through the handler chain (typically a single
/// [`MapController`](super::MapController)) and are then multicast to the
/// layers of the map.
pub struct EventProcessor {
    handlers: Vec<Box<dyn UserEventHandler>>,
    state: GestureState,
    pointer_position: Point2,
    last_pinch_end: SystemTime,
    last_touch_hint: SystemTime,
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self {
            handlers: vec![],
            state: GestureState::Idle,
            pointer_position: Point2::default(),
            last_pinch_end: SystemTime::UNIX_EPOCH,
            last_touch_hint: SystemTime::UNIX_EPOCH,
        }
    }
}

impl EventProcessor {
    /// Adds a handler to the end of the handler chain.
    pub fn add_handler(&mut self, handler: impl UserEventHandler + 'static) {
        self.handlers.push(Box::new(handler));
    }

    /// Processes a raw input event, updating the map through the handler
    /// chain and multicasting the resulting events to the map layers.
    pub fn handle(&mut self, event: RawUserEvent, map: &mut Map) {
        for event in self.process(event) {
            for handler in &self.handlers {
                match handler.handle(&event, map) {
                    EventPropagation::Propagate => {}
                    EventPropagation::Stop => break,
                }
            }

            map.emit(&event);
        }
    }

    /// Runs the state machine over one raw event and returns the produced
    /// map events in dispatch order.
    pub(crate) fn process(&mut self, event: RawUserEvent) -> Vec<MapEvent> {
        match event {
            RawUserEvent::ButtonPressed(position) => self.button_pressed(position),
            RawUserEvent::ButtonReleased(position) => self.button_released(position),
            RawUserEvent::PointerMoved(position) => self.pointer_moved(position),
            RawUserEvent::Scroll {
                delta,
                zoom_modifier,
            } => self.scroll(delta, zoom_modifier),
            RawUserEvent::TouchStart(touches) => self.touch_start(&touches),
            RawUserEvent::TouchMove(touches) => self.touch_move(&touches),
            RawUserEvent::TouchEnd(touches) => self.touch_end(&touches),
        }
    }

    fn button_pressed(&mut self, position: Point2) -> Vec<MapEvent> {
        if self.state != GestureState::Idle {
            log::warn!("mouse press received mid-gesture, ignoring");
            return vec![];
        }

        self.state = GestureState::Dragging {
            touch: None,
            position,
        };
        vec![MapEvent::SingleDown(mouse_pointer(position, false))]
    }

    fn button_released(&mut self, position: Point2) -> Vec<MapEvent> {
        match self.state {
            GestureState::Dragging { touch: None, .. } => {
                self.state = GestureState::Idle;
                vec![MapEvent::SingleUp(mouse_pointer(position, false))]
            }
            _ => vec![],
        }
    }

    fn pointer_moved(&mut self, position: Point2) -> Vec<MapEvent> {
        self.pointer_position = position;

        match &mut self.state {
            GestureState::Dragging {
                touch: None,
                position: last,
            } => {
                let delta = position - *last;
                *last = position;
                vec![MapEvent::SingleMove {
                    pointer: mouse_pointer(position, false),
                    delta,
                    panning: true,
                }]
            }
            GestureState::Idle => vec![MapEvent::SingleMove {
                pointer: mouse_pointer(position, false),
                delta: Vector2::default(),
                panning: false,
            }],
            _ => vec![],
        }
    }

    fn scroll(&mut self, delta: f64, zoom_modifier: bool) -> Vec<MapEvent> {
        if zoom_modifier {
            vec![MapEvent::Wheel {
                position: self.pointer_position,
                factor: 2f64.powf(-delta / WHEEL_ZOOM_DIVISOR),
            }]
        } else {
            vec![MapEvent::ControlHint(ControlHint::UseCtrlToZoom)]
        }
    }

    fn touch_start(&mut self, touches: &TouchState) -> Vec<MapEvent> {
        let active = touches.touches();
        if active.len() > 2 {
            log::warn!(
                "{} simultaneous touches, tracking only the first two",
                active.len()
            );
        }

        match active {
            [] => vec![],
            [touch] => match self.state {
                GestureState::Idle => {
                    self.state = GestureState::Dragging {
                        touch: Some(touch.id),
                        position: touch.position,
                    };
                    vec![MapEvent::SingleDown(touch_pointer(touch.position, false))]
                }
                _ => {
                    log::warn!("touch start received mid-gesture, ignoring");
                    vec![]
                }
            },
            [first, second, ..] => {
                let mut events = match self.state {
                    GestureState::Dragging {
                        touch: Some(_),
                        position,
                    } => vec![MapEvent::SingleUp(touch_pointer(position, true))],
                    GestureState::Idle => vec![
                        MapEvent::SingleDown(touch_pointer(first.position, false)),
                        MapEvent::SingleUp(touch_pointer(first.position, true)),
                    ],
                    _ => {
                        log::warn!("unexpected touch start while pinching, resetting");
                        vec![]
                    }
                };

                self.state = GestureState::Pinching {
                    first: *first,
                    second: *second,
                };
                events.push(MapEvent::DoubleDown(PinchEvent {
                    first: first.position,
                    second: second.position,
                }));
                events
            }
        }
    }

    fn touch_move(&mut self, touches: &TouchState) -> Vec<MapEvent> {
        match &mut self.state {
            GestureState::Dragging {
                touch: Some(id),
                position: last,
            } => {
                let Some(touch) = touches.get(*id) else {
                    return vec![];
                };

                let delta = touch.position - *last;
                *last = touch.position;

                let mut events = vec![MapEvent::SingleMove {
                    pointer: touch_pointer(touch.position, false),
                    delta,
                    panning: false,
                }];
                if self.should_hint_two_fingers() {
                    events.push(MapEvent::ControlHint(ControlHint::UseTwoFingers));
                }
                events
            }
            GestureState::Pinching { first, second } => {
                let old_midpoint = first.position.midpoint(&second.position);
                let old_distance = first.position.distance(&second.position);

                if let Some(touch) = touches.get(first.id) {
                    first.position = touch.position;
                }
                if let Some(touch) = touches.get(second.id) {
                    second.position = touch.position;
                }

                let pinch = PinchEvent {
                    first: first.position,
                    second: second.position,
                };
                let zoom_ratio = if old_distance > 0.0 {
                    pinch.distance() / old_distance
                } else {
                    1.0
                };

                vec![MapEvent::DoubleMove {
                    pinch,
                    midpoint_delta: pinch.midpoint() - old_midpoint,
                    zoom_ratio,
                }]
            }
            _ => vec![],
        }
    }

    fn touch_end(&mut self, touches: &TouchState) -> Vec<MapEvent> {
        match self.state {
            GestureState::Dragging {
                touch: Some(id),
                position,
            } => {
                if touches.get(id).is_some() {
                    return vec![];
                }

                self.state = GestureState::Idle;
                vec![MapEvent::SingleUp(touch_pointer(position, false))]
            }
            GestureState::Pinching { first, second } => {
                self.last_pinch_end = SystemTime::now();
                let pinch = PinchEvent {
                    first: first.position,
                    second: second.position,
                };

                let survivors: Vec<_> = [first, second]
                    .into_iter()
                    .filter_map(|touch| touches.get(touch.id))
                    .collect();

                match survivors.as_slice() {
                    [survivor] => {
                        self.state = GestureState::Dragging {
                            touch: Some(survivor.id),
                            position: survivor.position,
                        };
                        vec![
                            MapEvent::DoubleUp(pinch),
                            MapEvent::SingleDown(touch_pointer(survivor.position, true)),
                        ]
                    }
                    [] => {
                        // Both touches vanished in one event. Rare, but some
                        // platforms deliver it; replay the hand-off sequence
                        // with the last known first-touch position.
                        log::warn!("both touches of a pinch ended in a single event");
                        self.state = GestureState::Idle;
                        vec![
                            MapEvent::DoubleUp(pinch),
                            MapEvent::SingleDown(touch_pointer(first.position, true)),
                            MapEvent::SingleUp(touch_pointer(first.position, false)),
                        ]
                    }
                    _ => vec![],
                }
            }
            _ => vec![],
        }
    }

    fn should_hint_two_fingers(&mut self) -> bool {
        let now = SystemTime::now();
        let since_pinch = now
            .duration_since(self.last_pinch_end)
            .unwrap_or_default();
        let since_hint = now
            .duration_since(self.last_touch_hint)
            .unwrap_or_default();

        if since_pinch > TOUCH_HINT_INTERVAL && since_hint > TOUCH_HINT_INTERVAL {
            self.last_touch_hint = now;
            true
        } else {
            false
        }
    }
}

fn mouse_pointer(position: Point2, switching: bool) -> PointerEvent {
    PointerEvent {
        position,
        switching,
        from_mouse: true,
    }
}

fn touch_pointer(position: Point2, switching: bool) -> PointerEvent {
    PointerEvent {
        position,
        switching,
        from_mouse: false,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn touch(id: TouchId, x: f64, y: f64) -> TouchPoint {
        TouchPoint {
            id,
            position: Point2::new(x, y),
        }
    }

    fn touch_state(touches: &[TouchPoint]) -> TouchState {
        TouchState::new(touches.to_vec())
    }

    #[test]
    fn touch_handoff_sequence() {
        let mut processor = EventProcessor::default();
        let a = touch(1, 10.0, 10.0);
        let b = touch(2, 50.0, 50.0);

        let events = processor.process(RawUserEvent::TouchStart(touch_state(&[a])));
        assert_matches!(
            events.as_slice(),
            [MapEvent::SingleDown(PointerEvent {
                switching: false,
                from_mouse: false,
                ..
            })]
        );

        let events = processor.process(RawUserEvent::TouchStart(touch_state(&[a, b])));
        assert_matches!(
            events.as_slice(),
            [
                MapEvent::SingleUp(PointerEvent {
                    switching: true,
                    ..
                }),
                MapEvent::DoubleDown(_),
            ]
        );

        let events = processor.process(RawUserEvent::TouchEnd(touch_state(&[b])));
        assert_matches!(
            events.as_slice(),
            [
                MapEvent::DoubleUp(_),
                MapEvent::SingleDown(PointerEvent {
                    switching: true,
                    ..
                }),
            ]
        );
        let MapEvent::SingleDown(pointer) = &events[1] else {
            unreachable!()
        };
        assert_eq!(pointer.position, b.position);

        let events = processor.process(RawUserEvent::TouchEnd(touch_state(&[])));
        assert_matches!(
            events.as_slice(),
            [MapEvent::SingleUp(PointerEvent {
                switching: false,
                ..
            })]
        );
    }

    #[test]
    fn simultaneous_double_release_is_replayed() {
        let mut processor = EventProcessor::default();
        let a = touch(1, 10.0, 10.0);
        let b = touch(2, 50.0, 50.0);

        processor.process(RawUserEvent::TouchStart(touch_state(&[a])));
        processor.process(RawUserEvent::TouchStart(touch_state(&[a, b])));

        let events = processor.process(RawUserEvent::TouchEnd(touch_state(&[])));
        assert_matches!(
            events.as_slice(),
            [
                MapEvent::DoubleUp(_),
                MapEvent::SingleDown(PointerEvent {
                    switching: true,
                    ..
                }),
                MapEvent::SingleUp(PointerEvent {
                    switching: false,
                    ..
                }),
            ]
        );

        // The synthesized events reuse the stale first-touch position.
        let MapEvent::SingleDown(pointer) = &events[1] else {
            unreachable!()
        };
        assert_eq!(pointer.position, a.position);
    }

    #[test]
    fn pinch_produces_zoom_ratio_and_midpoint_delta() {
        let mut processor = EventProcessor::default();
        let a = touch(1, 0.0, 0.0);
        let b = touch(2, 100.0, 0.0);

        processor.process(RawUserEvent::TouchStart(touch_state(&[a])));
        processor.process(RawUserEvent::TouchStart(touch_state(&[a, b])));

        let moved = [touch(1, -50.0, 10.0), touch(2, 150.0, 10.0)];
        let events = processor.process(RawUserEvent::TouchMove(touch_state(&moved)));

        assert_matches!(events.as_slice(), [MapEvent::DoubleMove { .. }]);
        let MapEvent::DoubleMove {
            midpoint_delta,
            zoom_ratio,
            ..
        } = &events[0]
        else {
            unreachable!()
        };
        assert_eq!(*zoom_ratio, 2.0);
        assert_eq!(*midpoint_delta, Vector2::new(0.0, 10.0));
    }

    #[test]
    fn mouse_drag_pans() {
        let mut processor = EventProcessor::default();

        let events = processor.process(RawUserEvent::ButtonPressed(Point2::new(5.0, 5.0)));
        assert_matches!(events.as_slice(), [MapEvent::SingleDown(_)]);

        let events = processor.process(RawUserEvent::PointerMoved(Point2::new(9.0, 2.0)));
        assert_matches!(
            events.as_slice(),
            [MapEvent::SingleMove { panning: true, .. }]
        );
        let MapEvent::SingleMove { delta, .. } = &events[0] else {
            unreachable!()
        };
        assert_eq!(*delta, Vector2::new(4.0, -3.0));

        let events = processor.process(RawUserEvent::ButtonReleased(Point2::new(9.0, 2.0)));
        assert_matches!(events.as_slice(), [MapEvent::SingleUp(_)]);
    }

    #[test]
    fn idle_mouse_moves_do_not_pan() {
        let mut processor = EventProcessor::default();
        let events = processor.process(RawUserEvent::PointerMoved(Point2::new(9.0, 2.0)));
        assert_matches!(
            events.as_slice(),
            [MapEvent::SingleMove { panning: false, .. }]
        );
    }

    #[test]
    fn wheel_without_modifier_hints_instead_of_zooming() {
        let mut processor = EventProcessor::default();

        let events = processor.process(RawUserEvent::Scroll {
            delta: 250.0,
            zoom_modifier: false,
        });
        assert_eq!(
            events,
            vec![MapEvent::ControlHint(ControlHint::UseCtrlToZoom)]
        );

        let events = processor.process(RawUserEvent::Scroll {
            delta: 250.0,
            zoom_modifier: true,
        });
        assert_matches!(events.as_slice(), [MapEvent::Wheel { .. }]);
        let MapEvent::Wheel { factor, .. } = &events[0] else {
            unreachable!()
        };
        assert_eq!(*factor, 0.5);
    }

    #[test]
    fn single_touch_drag_hints_at_most_once_per_interval() {
        let mut processor = EventProcessor::default();
        let a = touch(1, 10.0, 10.0);

        processor.process(RawUserEvent::TouchStart(touch_state(&[a])));

        let moved = touch(1, 20.0, 10.0);
        let events = processor.process(RawUserEvent::TouchMove(touch_state(&[moved])));
        assert!(events.contains(&MapEvent::ControlHint(ControlHint::UseTwoFingers)));

        // An immediate second move is rate limited.
        let moved = touch(1, 30.0, 10.0);
        let events = processor.process(RawUserEvent::TouchMove(touch_state(&[moved])));
        assert!(!events.contains(&MapEvent::ControlHint(ControlHint::UseTwoFingers)));
    }

    #[test]
    fn no_hint_right_after_a_pinch() {
        let mut processor = EventProcessor::default();
        let a = touch(1, 10.0, 10.0);
        let b = touch(2, 50.0, 50.0);

        processor.process(RawUserEvent::TouchStart(touch_state(&[a])));
        processor.process(RawUserEvent::TouchStart(touch_state(&[a, b])));
        processor.process(RawUserEvent::TouchEnd(touch_state(&[a])));

        let moved = touch(1, 20.0, 10.0);
        let events = processor.process(RawUserEvent::TouchMove(touch_state(&[moved])));
        assert!(!events.contains(&MapEvent::ControlHint(ControlHint::UseTwoFingers)));
    }
}
