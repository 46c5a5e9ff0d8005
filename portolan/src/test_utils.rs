//! Shared doubles for the crate's unit tests.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use portolan_types::cartesian::{Rect, Size};

use crate::control::MapEvent;
use crate::decoded_image::DecodedImage;
use crate::error::PortolanError;
use crate::layer::{EventOutcome, Layer};
use crate::map::Map;
use crate::messenger::Messenger;
use crate::render::{Badge, Canvas, PointPaint, PointSet};
use crate::view::MapView;

/// One recorded canvas operation.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasOp {
    BeginFrame,
    Image {
        image_id: u64,
        source: Rect,
        dest: Rect,
        opacity: f32,
    },
    Points {
        set_id: u64,
        count: usize,
        size: f32,
    },
}

/// Canvas that records every call instead of painting.
pub struct RecordingCanvas {
    size: Size,
    pub ops: Vec<CanvasOp>,
    pub badges: Vec<Badge>,
    pub last_view: Option<MapView>,
    pub fail_points: bool,
}

impl Default for RecordingCanvas {
    fn default() -> Self {
        Self::with_size(Size::new(800.0, 600.0))
    }
}

impl RecordingCanvas {
    pub fn with_size(size: Size) -> Self {
        Self {
            size,
            ops: vec![],
            badges: vec![],
            last_view: None,
            fail_points: false,
        }
    }

    pub fn images(&self) -> Vec<&CanvasOp> {
        self.ops
            .iter()
            .filter(|op| matches!(op, CanvasOp::Image { .. }))
            .collect()
    }

    pub fn point_draws(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, CanvasOp::Points { .. }))
            .count()
    }
}

impl Canvas for RecordingCanvas {
    fn size(&self) -> Size {
        self.size
    }

    fn begin_frame(&mut self, view: &MapView) {
        self.last_view = Some(view.clone());
        self.ops.push(CanvasOp::BeginFrame);
    }

    fn draw_image(&mut self, image: &DecodedImage, source: Rect, dest: Rect, opacity: f32) {
        self.ops.push(CanvasOp::Image {
            image_id: image.id(),
            source,
            dest,
            opacity,
        });
    }

    fn draw_points(&mut self, set: &PointSet, paint: PointPaint) -> Result<(), PortolanError> {
        if self.fail_points {
            return Err(PortolanError::Render("injected test failure".into()));
        }

        self.ops.push(CanvasOp::Points {
            set_id: set.id(),
            count: set.len(),
            size: paint.size,
        });
        Ok(())
    }

    fn draw_badge(&mut self, badge: Badge) {
        self.badges.push(badge);
    }
}

/// Layer that counts its callbacks and records received events.
#[derive(Default)]
pub struct CountingLayer {
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
    updates: AtomicUsize,
    redraws: AtomicUsize,
    events: Mutex<Vec<MapEvent>>,
}

impl CountingLayer {
    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn redraws(&self) -> usize {
        self.redraws.load(Ordering::SeqCst)
    }

    pub fn events(&self) -> Vec<MapEvent> {
        self.events.lock().clone()
    }
}

impl Layer for CountingLayer {
    fn on_register(&self, _map: &Map) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_unregister(&self, _map: &Map) {
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
    }

    fn on_update(&self, _map: &Map) {
        self.updates.fetch_add(1, Ordering::SeqCst);
    }

    fn on_redraw(&self, _map: &Map, _canvas: &mut dyn Canvas) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }

    fn on_event(&self, event: &MapEvent, _map: &Map) -> EventOutcome {
        self.events.lock().push(event.clone());
        EventOutcome::Handled
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Messenger that counts redraw requests.
#[derive(Default)]
pub struct CountingMessenger {
    requests: AtomicUsize,
}

impl CountingMessenger {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl Messenger for CountingMessenger {
    fn request_redraw(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}
