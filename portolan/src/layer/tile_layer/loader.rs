//! Fetching and decoding of raster tiles.

use std::sync::Arc;

use crate::decoded_image::DecodedImage;
use crate::error::PortolanError;
use crate::layer::tile_layer::cache::{TileCache, TileIndex};
use crate::messenger::Messenger;

/// Source of tile URLs: maps a tile index to the address of its image.
pub trait UrlSource: (Fn(&TileIndex) -> String) + Send + Sync {}
impl<T: (Fn(&TileIndex) -> String) + Send + Sync> UrlSource for T {}

/// Loads tile images for a [`TileLayer`](super::TileLayer).
#[async_trait::async_trait]
pub trait TileLoader: Send + Sync {
    /// Loads and decodes the tile with the given index.
    async fn load(&self, index: TileIndex) -> Result<DecodedImage, PortolanError>;
}

/// Tile loader that requests every tile with a separate HTTP GET.
///
/// Works with any protocol that addresses tiles by separate URLs (OSM tile
/// protocol, TMS, ArcGIS tile services, ...). Decoding happens on a
/// blocking worker so the async executor is never stalled by image codecs.
///
/// # Example
///
/// ```no_run
/// use portolan::layer::tile_layer::RestTileLoader;
///
/// let loader = RestTileLoader::new(|index: &portolan::layer::tile_layer::TileIndex| {
///     format!(
///         "https://tile.openstreetmap.org/{}/{}/{}.png",
///         index.z, index.x, index.y
///     )
/// });
/// ```
pub struct RestTileLoader {
    url_source: Box<dyn UrlSource>,
    client: reqwest::Client,
}

impl RestTileLoader {
    /// Creates a new loader over the given URL source.
    pub fn new(url_source: impl UrlSource + 'static) -> Self {
        Self {
            url_source: Box::new(url_source),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl TileLoader for RestTileLoader {
    async fn load(&self, index: TileIndex) -> Result<DecodedImage, PortolanError> {
        let url = (self.url_source)(&index);
        log::debug!("Loading tile {url}");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            log::debug!("Failed to load {url}: {}", response.status());
            return Err(PortolanError::Io);
        }

        let bytes = response.bytes().await?;
        tokio::task::spawn_blocking(move || DecodedImage::decode(&bytes))
            .await
            .map_err(|_| PortolanError::Task)?
    }
}

/// Body of a tile fetch task: loads the tile, stores the outcome in the
/// cache and asks for a redraw on success.
///
/// Failures are tolerated silently: the slot becomes a permanent miss and
/// the layer keeps showing whatever placeholder it has.
pub(crate) async fn fetch_into_cache(
    loader: Arc<dyn TileLoader>,
    cache: Arc<TileCache>,
    index: TileIndex,
    messenger: Option<Arc<dyn Messenger>>,
) {
    match loader.load(index).await {
        Ok(image) => {
            cache.fulfill(index, Some(image));
            if let Some(messenger) = messenger {
                messenger.request_redraw();
            }
        }
        Err(error) => {
            log::debug!("Tile {index:?} failed to load: {error}");
            cache.fulfill(index, None);
        }
    }
}
