//! Keyed store of loaded tile images.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::decoded_image::DecodedImage;

/// Highest tile level the engine addresses. With the key packing below this
/// keeps every valid `(x, y, z)` triple in the `u64` range with room to
/// spare.
pub const MAX_TILE_LEVEL: u8 = 25;

/// Number of key slots reserved for the level; must stay above
/// `MAX_TILE_LEVEL`.
const LEVEL_SLOTS: u64 = 32;

/// Index of a tile in the power-of-two grid.
///
/// Level `z` splits the world into `2^z × 2^z` tiles; `x` grows eastwards,
/// `y` southwards, both in `0..2^z`.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TileIndex {
    /// Column index.
    pub x: u32,
    /// Row index.
    pub y: u32,
    /// Zoom level of the grid.
    pub z: u8,
}

impl TileIndex {
    /// Creates a new index instance.
    pub fn new(x: u32, y: u32, z: u8) -> Self {
        Self { x, y, z }
    }

    /// Collision-free cache key of the index.
    ///
    /// Packs the cell number within the level together with the level
    /// itself: `(x + y·2^z)·32 + z`. Injective over all valid indices up to
    /// [`MAX_TILE_LEVEL`].
    pub fn key(&self) -> u64 {
        debug_assert!(self.z <= MAX_TILE_LEVEL);
        debug_assert!(self.x < 1 << self.z);
        debug_assert!(self.y < 1 << self.z);

        let cell = self.x as u64 + ((self.y as u64) << self.z);
        cell * LEVEL_SLOTS + self.z as u64
    }

    /// The tile one level coarser that contains this tile.
    pub fn parent(&self) -> Option<TileIndex> {
        if self.z == 0 {
            return None;
        }

        Some(TileIndex::new(self.x >> 1, self.y >> 1, self.z - 1))
    }

    /// The four tiles one level finer that cover this tile, in row-major
    /// order.
    pub fn children(&self) -> [TileIndex; 4] {
        let (x, y, z) = (self.x * 2, self.y * 2, self.z + 1);
        [
            TileIndex::new(x, y, z),
            TileIndex::new(x + 1, y, z),
            TileIndex::new(x, y + 1, z),
            TileIndex::new(x + 1, y + 1, z),
        ]
    }
}

#[derive(Debug, Clone)]
enum TileSlot {
    /// A fetch was issued and has not produced a result yet.
    Loading,
    /// The tile is decoded and ready to draw.
    Ready(DecodedImage),
    /// The fetch or decode failed. The slot stays a permanent miss; tiles
    /// are only retried after the whole cache is cleared.
    Failed,
}

/// Store of tile images owned by a single tile layer.
///
/// Entries are created when a fetch is issued and move to `Ready` at most
/// once. There is no per-tile eviction; the cache is cleared wholesale when
/// the owning layer is unregistered.
#[derive(Default)]
pub struct TileCache {
    slots: RwLock<HashMap<u64, TileSlot, ahash::RandomState>>,
}

impl TileCache {
    /// Marks the tile as loading if nothing is known about it yet.
    ///
    /// Returns `true` if the caller should issue a fetch for the tile, and
    /// `false` if a fetch was already issued before (whatever its outcome).
    pub fn begin_loading(&self, index: TileIndex) -> bool {
        let mut slots = self.slots.write();
        match slots.entry(index.key()) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(TileSlot::Loading);
                true
            }
        }
    }

    /// Stores the result of a fetch. `None` marks the tile as permanently
    /// failed. A tile that is already `Ready` is never overwritten.
    pub fn fulfill(&self, index: TileIndex, image: Option<DecodedImage>) {
        let mut slots = self.slots.write();
        let slot = slots.entry(index.key()).or_insert(TileSlot::Loading);
        if matches!(slot, TileSlot::Ready(_)) {
            return;
        }

        *slot = match image {
            Some(image) => TileSlot::Ready(image),
            None => TileSlot::Failed,
        };
    }

    /// Returns the image of the tile if it is loaded.
    pub fn get_ready(&self, index: TileIndex) -> Option<DecodedImage> {
        match self.slots.read().get(&index.key()) {
            Some(TileSlot::Ready(image)) => Some(image.clone()),
            _ => None,
        }
    }

    /// Drops all entries.
    pub fn clear(&self) {
        self.slots.write().clear();
    }

    /// Number of known tiles, including in-flight and failed ones.
    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// `true` if the cache knows about no tiles.
    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> DecodedImage {
        DecodedImage::from_raw(vec![255u8; 4], 1, 1).expect("valid image")
    }

    #[test]
    fn keys_are_injective_for_low_levels() {
        let mut seen = std::collections::HashSet::new();
        for z in 0..=6u8 {
            for y in 0..(1u32 << z) {
                for x in 0..(1u32 << z) {
                    assert!(
                        seen.insert(TileIndex::new(x, y, z).key()),
                        "key collision at ({x}, {y}, {z})"
                    );
                }
            }
        }
    }

    #[test]
    fn keys_are_injective_for_sampled_high_levels() {
        // Simple LCG so the sample is reproducible.
        let mut state = 0x2545F4914F6CDD1Du64;
        let mut next = move || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            state
        };

        let mut seen = std::collections::HashMap::new();
        for _ in 0..100_000 {
            let z = (next() % (MAX_TILE_LEVEL as u64 - 6) + 7) as u8;
            let x = (next() % (1u64 << z)) as u32;
            let y = (next() % (1u64 << z)) as u32;
            let index = TileIndex::new(x, y, z);

            if let Some(previous) = seen.insert(index.key(), index) {
                assert_eq!(previous, index, "key collision between tiles");
            }
        }
    }

    #[test]
    fn parent_and_children_are_consistent() {
        let index = TileIndex::new(5, 9, 4);
        for child in index.children() {
            assert_eq!(child.parent(), Some(index));
        }
        assert_eq!(TileIndex::new(0, 0, 0).parent(), None);
    }

    #[test]
    fn begin_loading_is_issued_once() {
        let cache = TileCache::default();
        let index = TileIndex::new(1, 2, 3);

        assert!(cache.begin_loading(index));
        assert!(!cache.begin_loading(index));

        cache.fulfill(index, None);
        assert!(!cache.begin_loading(index), "failed tiles are not retried");

        cache.clear();
        assert!(cache.begin_loading(index));
    }

    #[test]
    fn fulfill_transitions_only_once_to_ready() {
        let cache = TileCache::default();
        let index = TileIndex::new(1, 2, 3);

        cache.begin_loading(index);
        assert!(cache.get_ready(index).is_none());

        let first = image();
        let first_id = first.id();
        cache.fulfill(index, Some(first));
        assert_eq!(cache.get_ready(index).map(|i| i.id()), Some(first_id));

        cache.fulfill(index, Some(image()));
        assert_eq!(
            cache.get_ready(index).map(|i| i.id()),
            Some(first_id),
            "a ready tile must not be replaced"
        );
    }

    #[test]
    fn failed_tiles_stay_missing() {
        let cache = TileCache::default();
        let index = TileIndex::new(0, 0, 1);

        cache.begin_loading(index);
        cache.fulfill(index, None);

        assert!(cache.get_ready(index).is_none());
        assert_eq!(cache.len(), 1);
    }
}
