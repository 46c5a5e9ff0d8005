//! The map itself: viewport state, layer registry and the redraw cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use portolan_types::cartesian::{Point2, Size, Vector2};
use portolan_types::geo::GeoPoint2d;

use crate::control::MapEvent;
use crate::layer::Layer;
use crate::messenger::Messenger;
use crate::render::Canvas;
use crate::view::MapView;

mod layer_collection;

pub use layer_collection::LayerCollection;

/// Default lower bound for the zoom: the world never gets smaller than one
/// standard tile.
const DEFAULT_MIN_ZOOM: f64 = 256.0;

/// Per-frame decay of the remaining smooth-zoom factor (in log space).
const SMOOTH_ZOOM_DECAY: f64 = 0.7;

/// A smooth zoom is finished once the remaining factor is within 1% of 1.
const SMOOTH_ZOOM_TOLERANCE: f64 = 0.01;

struct SmoothZoom {
    pivot: Point2,
    remaining: f64,
}

/// The map: a [`MapView`] camera plus an ordered set of [`Layer`]s.
///
/// The map owns the viewport state exclusively; layers read it during their
/// callbacks and mutate it only through the public methods here. All view
/// mutations request a redraw through the injected [`Messenger`], and any
/// number of mutations within one frame collapse into a single repaint the
/// next time the host calls [`Map::render`].
pub struct Map {
    view: MapView,
    min_zoom: f64,
    layers: LayerCollection,
    messenger: Option<Arc<dyn Messenger>>,
    smooth_zoom: Option<SmoothZoom>,
    redraw_requested: AtomicBool,
}

impl Map {
    /// Creates a new map showing the given view.
    pub fn new(view: MapView, messenger: Option<Arc<dyn Messenger>>) -> Self {
        Self {
            view,
            min_zoom: DEFAULT_MIN_ZOOM,
            layers: LayerCollection::default(),
            messenger,
            smooth_zoom: None,
            redraw_requested: AtomicBool::new(true),
        }
    }

    /// Sets the lower zoom bound enforced by all zoom operations.
    pub fn with_min_zoom(mut self, min_zoom: f64) -> Self {
        self.min_zoom = min_zoom;
        self.view = self.view.with_zoom(self.view.zoom().max(min_zoom));
        self
    }

    /// Current view of the map.
    pub fn view(&self) -> &MapView {
        &self.view
    }

    /// Lower bound of the zoom.
    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Returns the list of the map's layers.
    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    /// The messenger used to schedule redraws, if any.
    pub fn messenger(&self) -> Option<Arc<dyn Messenger>> {
        self.messenger.clone()
    }

    /// Sets a new messenger for the map.
    pub fn set_messenger(&mut self, messenger: Option<Arc<dyn Messenger>>) {
        self.messenger = messenger;
    }

    /// Shifts the camera by the given number of screen pixels.
    pub fn move_by(&mut self, delta: Vector2) {
        self.view = self.view.translated_by_px(delta);
        self.emit(&MapEvent::Moved);
        self.request_redraw();
    }

    /// Multiplies the zoom by `factor`, keeping the geographic point under
    /// the `pivot` screen position fixed. The result never goes below the
    /// configured minimum zoom.
    pub fn zoom_around(&mut self, pivot: Point2, factor: f64) {
        let new_zoom = (self.view.zoom() * factor).max(self.min_zoom);
        self.view = self.view.zoomed_around(pivot, new_zoom);
        self.emit(&MapEvent::Zoomed);
        self.request_redraw();
    }

    /// Same effect as [`Map::zoom_around`], but applied gradually over the
    /// following frames with an exponential ease.
    ///
    /// Repeated calls before the animation finishes accumulate into the
    /// pending factor and move the pivot to the latest position.
    pub fn smooth_zoom_around(&mut self, pivot: Point2, factor: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        match &mut self.smooth_zoom {
            Some(animation) => {
                animation.remaining *= factor;
                animation.pivot = pivot;
            }
            None => {
                self.smooth_zoom = Some(SmoothZoom {
                    pivot,
                    remaining: factor,
                });
            }
        }

        self.request_redraw();
    }

    /// Absolute jump of the camera: sets the center and the zoom level
    /// (`zoom = 2^level`) directly, bypassing any running animation.
    pub fn jump_to(&mut self, center: GeoPoint2d, level: f64) {
        self.smooth_zoom = None;
        let zoom = 2f64.powf(level).max(self.min_zoom);
        self.view = self.view.with_center(center).with_zoom(zoom);
        self.emit(&MapEvent::Moved);
        self.emit(&MapEvent::Zoomed);
        self.request_redraw();
    }

    /// Updates the viewport size and DPI scale after the host surface
    /// changed. The host owns the resize observation; the backing store is
    /// expected to be `size × dpi_scale` physical pixels.
    pub fn resize(&mut self, size: Size, dpi_scale: f64) {
        self.view = self.view.with_size(size).with_dpi_scale(dpi_scale);
        self.request_redraw();
    }

    /// Registers a layer at the end of the paint order and synchronously
    /// calls its [`Layer::on_register`].
    ///
    /// # Panics
    ///
    /// Panics if the same layer instance is already registered.
    pub fn register(&mut self, layer: Arc<dyn Layer>) {
        self.layers.insert(layer.clone());
        layer.on_register(self);
        self.request_redraw();
    }

    /// Removes a layer and synchronously calls its
    /// [`Layer::on_unregister`].
    ///
    /// # Panics
    ///
    /// Panics if the layer instance is not registered.
    pub fn unregister(&mut self, layer: &Arc<dyn Layer>) {
        let layer = self.layers.remove(layer);
        layer.on_unregister(self);
        self.request_redraw();
    }

    /// Requests a redraw of the map.
    ///
    /// Idempotent: any number of requests within one frame result in a
    /// single repaint when the host calls [`Map::render`].
    pub fn request_redraw(&self) {
        self.redraw_requested.store(true, Ordering::Release);
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    /// `true` if a redraw was requested since the last rendered frame.
    pub fn redraw_requested(&self) -> bool {
        self.redraw_requested.load(Ordering::Acquire)
    }

    /// Renders one frame.
    ///
    /// Advances the smooth-zoom animation if one is running, then calls
    /// every layer's `on_update` and `on_redraw` in registration order. If
    /// the animation has not converged yet, another frame is requested
    /// after painting.
    pub fn render(&mut self, canvas: &mut dyn Canvas) {
        self.redraw_requested.store(false, Ordering::Release);
        self.animate();

        canvas.begin_frame(&self.view);

        for layer in self.layers.iter() {
            layer.on_update(self);
        }

        for layer in self.layers.iter() {
            layer.on_redraw(self, canvas);
        }

        if self.smooth_zoom.is_some() {
            self.request_redraw();
        }
    }

    /// Dispatches the event to every registered layer in registration
    /// order. All layers are invoked regardless of their outcome.
    pub fn emit(&self, event: &MapEvent) {
        for layer in self.layers.iter() {
            layer.on_event(event, self);
        }
    }

    fn animate(&mut self) {
        let Some(mut animation) = self.smooth_zoom.take() else {
            return;
        };

        let step = if (animation.remaining - 1.0).abs() <= SMOOTH_ZOOM_TOLERANCE {
            animation.remaining
        } else {
            let step = animation.remaining.powf(1.0 - SMOOTH_ZOOM_DECAY);
            animation.remaining = animation.remaining.powf(SMOOTH_ZOOM_DECAY);
            let pivot = animation.pivot;
            self.smooth_zoom = Some(animation);
            self.zoom_around(pivot, step);
            return;
        };

        self.zoom_around(animation.pivot, step);
    }
}
