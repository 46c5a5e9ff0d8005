//! Raster tile layer: loads prerendered tiles and blits them to the map.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use portolan_types::cartesian::Rect;

use crate::layer::Layer;
use crate::map::Map;
use crate::messenger::Messenger;
use crate::render::Canvas;
use crate::view::MapView;

mod cache;
mod loader;

pub use cache::{TileCache, TileIndex, MAX_TILE_LEVEL};
pub use loader::{RestTileLoader, TileLoader, UrlSource};

pub(crate) use loader::fetch_into_cache;

const DEFAULT_TILE_SIZE: u32 = 256;

/// Map layer that draws a raster tile pyramid.
///
/// Each frame the layer picks the tile level where one tile pixel is
/// roughly one screen pixel, computes the visible index range and blits the
/// tiles it has. While the exact tile is still loading, the matching
/// quadrant of its parent (scaled up) or any of its four children (scaled
/// down) stand in, so the map never shows holes for areas that were seen at
/// some zoom before. Missing tiles are fetched in the background; tiles
/// that fail to load are left out silently and never retried until the
/// cache is dropped.
pub struct TileLayer {
    loader: Arc<dyn TileLoader>,
    cache: Arc<TileCache>,
    tile_size: u32,
    messenger: Mutex<Option<Arc<dyn Messenger>>>,
}

impl TileLayer {
    /// Creates a new layer over the given tile loader.
    pub fn new(loader: impl TileLoader + 'static) -> Self {
        Self {
            loader: Arc::new(loader),
            cache: Arc::new(TileCache::default()),
            tile_size: DEFAULT_TILE_SIZE,
            messenger: Mutex::new(None),
        }
    }

    /// Creates a layer that loads tiles over HTTP from the given URL
    /// source.
    pub fn from_url(url_source: impl UrlSource + 'static) -> Self {
        Self::new(RestTileLoader::new(url_source))
    }

    /// Overrides the tile edge length in pixels (256 by default).
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Tile level to display for the view: the level where one tile pixel
    /// is closest to one screen pixel.
    fn level(&self, view: &MapView) -> u8 {
        let level = (view.zoom().log2() - (self.tile_size as f64).log2()).round();
        level.clamp(0.0, MAX_TILE_LEVEL as f64) as u8
    }

    /// Indices of the tiles that intersect the viewport, together with the
    /// level they are on.
    fn visible_tiles(&self, view: &MapView) -> (u8, Vec<TileIndex>) {
        let level = self.level(view);
        let size = view.size();
        if size.is_zero() {
            return (level, vec![]);
        }

        let tiles_across = 1i64 << level;
        let tile_span = view.zoom() / tiles_across as f64;
        let origin = view.pixel_origin();

        let min_x = (origin.x() / tile_span).floor() as i64;
        let max_x = ((origin.x() + size.width()) / tile_span).ceil() as i64 - 1;
        let min_y = (origin.y() / tile_span).floor() as i64;
        let max_y = ((origin.y() + size.height()) / tile_span).ceil() as i64 - 1;

        let mut tiles = vec![];
        for y in min_y.max(0)..=max_y.min(tiles_across - 1) {
            for x in min_x.max(0)..=max_x.min(tiles_across - 1) {
                tiles.push(TileIndex::new(x as u32, y as u32, level));
            }
        }

        (level, tiles)
    }

    /// Screen rectangle of the tile in physical pixels.
    ///
    /// Every edge is rounded to a whole physical pixel independently, so
    /// neighbouring tiles always share their edges exactly and no subpixel
    /// seams appear between them.
    fn tile_rect(&self, view: &MapView, index: TileIndex) -> Rect {
        let tiles_across = 1i64 << index.z;
        let tile_span = view.zoom() / tiles_across as f64;
        let origin = view.pixel_origin();
        let dpi = view.dpi_scale();

        Rect::new(
            ((index.x as f64 * tile_span - origin.x()) * dpi).round(),
            ((index.y as f64 * tile_span - origin.y()) * dpi).round(),
            (((index.x + 1) as f64 * tile_span - origin.x()) * dpi).round(),
            (((index.y + 1) as f64 * tile_span - origin.y()) * dpi).round(),
        )
    }

    /// Draws the best available content for one grid cell: the exact tile,
    /// else the matching parent quadrant, else any loaded children.
    fn draw_cell(&self, canvas: &mut dyn Canvas, index: TileIndex, dest: Rect) {
        let tile_size = self.tile_size as f64;

        if let Some(image) = self.cache.get_ready(index) {
            let source = Rect::new(0.0, 0.0, tile_size, tile_size);
            canvas.draw_image(&image, source, dest, 1.0);
            return;
        }

        if let Some(parent) = index.parent() {
            if let Some(image) = self.cache.get_ready(parent) {
                let half = tile_size / 2.0;
                let source_x = (index.x & 1) as f64 * half;
                let source_y = (index.y & 1) as f64 * half;
                let source = Rect::new(source_x, source_y, source_x + half, source_y + half);
                canvas.draw_image(&image, source, dest, 1.0);
                return;
            }
        }

        if index.z < MAX_TILE_LEVEL {
            let mid_x = (dest.x_min() + dest.x_max()) / 2.0;
            let mid_y = (dest.y_min() + dest.y_max()) / 2.0;

            for child in index.children() {
                let Some(image) = self.cache.get_ready(child) else {
                    continue;
                };

                let quarter = Rect::new(
                    if child.x & 1 == 0 { dest.x_min() } else { mid_x },
                    if child.y & 1 == 0 { dest.y_min() } else { mid_y },
                    if child.x & 1 == 0 { mid_x } else { dest.x_max() },
                    if child.y & 1 == 0 { mid_y } else { dest.y_max() },
                );
                let source = Rect::new(0.0, 0.0, tile_size, tile_size);
                canvas.draw_image(&image, source, quarter, 1.0);
            }
        }
    }
}

impl Layer for TileLayer {
    fn on_register(&self, map: &Map) {
        *self.messenger.lock() = map.messenger();
    }

    fn on_unregister(&self, _map: &Map) {
        self.cache.clear();
        *self.messenger.lock() = None;
    }

    fn on_update(&self, map: &Map) {
        let (_, tiles) = self.visible_tiles(map.view());
        let messenger = self.messenger.lock().clone();

        for index in tiles {
            if self.cache.begin_loading(index) {
                crate::async_runtime::spawn(fetch_into_cache(
                    self.loader.clone(),
                    self.cache.clone(),
                    index,
                    messenger.clone(),
                ));
            }
        }
    }

    fn on_redraw(&self, map: &Map, canvas: &mut dyn Canvas) {
        let view = map.view();
        let (_, tiles) = self.visible_tiles(view);

        for index in tiles {
            let dest = self.tile_rect(view, index);
            self.draw_cell(canvas, index, dest);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
