use std::sync::Arc;

use crate::layer::Layer;

/// Ordered collection of the layers registered with a map.
///
/// The order of the collection is the paint order and the event dispatch
/// order. A layer instance can be present at most once; violating that is a
/// caller bug and panics immediately.
#[derive(Default)]
pub struct LayerCollection(Vec<Arc<dyn Layer>>);

impl LayerCollection {
    /// Appends a layer to the collection.
    ///
    /// # Panics
    ///
    /// Panics if the same layer instance is already in the collection.
    pub(crate) fn insert(&mut self, layer: Arc<dyn Layer>) {
        assert!(
            !self.contains(&layer),
            "the layer is already registered with the map"
        );
        self.0.push(layer);
    }

    /// Removes a layer from the collection, preserving the order of the
    /// remaining layers.
    ///
    /// # Panics
    ///
    /// Panics if the layer instance is not in the collection.
    pub(crate) fn remove(&mut self, layer: &Arc<dyn Layer>) -> Arc<dyn Layer> {
        let index = self
            .0
            .iter()
            .position(|candidate| same_layer(candidate, layer))
            .expect("the layer is not registered with the map");
        self.0.remove(index)
    }

    /// `true` if the given layer instance is in the collection.
    pub fn contains(&self, layer: &Arc<dyn Layer>) -> bool {
        self.0.iter().any(|candidate| same_layer(candidate, layer))
    }

    /// Iterates the layers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Layer>> {
        self.0.iter()
    }

    /// Number of layers in the collection.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no layers are registered.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Layer identity is the identity of the allocation behind the `Arc`.
fn same_layer(a: &Arc<dyn Layer>, b: &Arc<dyn Layer>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
