use std::future::Future;

/// Spawns a fire-and-forget background task on the host's tokio runtime.
///
/// Tile loading is the only user; completion is reported through the tile
/// cache and the messenger, never awaited.
pub(crate) fn spawn<T>(future: T)
where
    T: Future + Send + 'static,
    T::Output: Send + 'static,
{
    tokio::spawn(future);
}
