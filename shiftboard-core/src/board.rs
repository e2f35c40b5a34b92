//! Map annotations: pins and freehand strokes over one map image.
//!
//! Pins and strokes are separate collections that share the active map
//! partition. Each gets its own controller, so a failure in one never blocks
//! the other's feed.

use crate::cache::LocalCache;
use crate::error::ShiftboardResult;
use crate::partition::PartitionKey;
use crate::record::{Collection, Pin, PinPatch, Point, Record, RecordId, Stroke};
use crate::remote::RemoteStore;
use crate::sync::{Mode, SyncController};

pub struct AnnotationBoard<R: RemoteStore> {
    pins: SyncController<Pin, R>,
    strokes: SyncController<Stroke, R>,
}

impl<R: RemoteStore + Clone> AnnotationBoard<R> {
    pub fn open(pins: Collection, strokes: Collection, cache: LocalCache, remote: Option<R>) -> Self {
        AnnotationBoard {
            pins: SyncController::open(pins, cache.clone(), remote.clone()),
            strokes: SyncController::open(strokes, cache, remote),
        }
    }

    /// Share both collections of the active map. One-way: there is no
    /// going back to local-only.
    ///
    /// Neither controller switches until both uploads succeeded, so a failed
    /// share leaves the whole board local and can be retried.
    pub async fn share(&mut self, remote: R) -> ShiftboardResult<()> {
        self.pins.upload_to(&remote).await?;
        self.strokes.upload_to(&remote).await?;
        self.pins.go_live(remote.clone())?;
        self.strokes.go_live(remote)
    }
}

impl<R: RemoteStore> AnnotationBoard<R> {
    pub fn open_map(&mut self, room: &str, map: &str) -> ShiftboardResult<()> {
        let partition = PartitionKey::map(room, map)?;
        self.pins.activate(partition.clone());
        self.strokes.activate(partition);
        Ok(())
    }

    pub fn mode(&self) -> Mode {
        self.pins.mode()
    }

    pub fn is_degraded(&self) -> bool {
        self.pins.is_degraded() || self.strokes.is_degraded()
    }

    pub fn pins(&self) -> &[Record<Pin>] {
        self.pins.records()
    }

    pub fn strokes(&self) -> &[Record<Stroke>] {
        self.strokes.records()
    }

    pub async fn place(&mut self, icon: &str, x: f64, y: f64, size: f64) -> ShiftboardResult<RecordId> {
        self.pins
            .add(Pin {
                icon: icon.trim().to_string(),
                x,
                y,
                size,
            })
            .await
    }

    pub async fn move_to(&mut self, id: &RecordId, x: f64, y: f64) -> ShiftboardResult<()> {
        self.pins.update(id, PinPatch::position(x, y)).await
    }

    pub async fn resize(&mut self, id: &RecordId, size: f64) -> ShiftboardResult<()> {
        self.pins.update(id, PinPatch::size(size)).await
    }

    pub async fn remove_pin(&mut self, id: &RecordId) -> ShiftboardResult<()> {
        self.pins.delete(id).await
    }

    pub async fn draw(&mut self, points: Vec<Point>, color: &str, width: f64) -> ShiftboardResult<RecordId> {
        self.strokes
            .add(Stroke {
                points,
                color: color.to_string(),
                width,
            })
            .await
    }

    pub async fn erase(&mut self, id: &RecordId) -> ShiftboardResult<()> {
        self.strokes.delete(id).await
    }

    /// Remove every pin and stroke on the active map.
    pub async fn clear_all(&mut self) -> ShiftboardResult<()> {
        self.pins.clear_partition().await?;
        self.strokes.clear_partition().await
    }

    pub async fn settle(&mut self) {
        self.pins.settle().await;
        self.strokes.settle().await;
    }

    pub fn drain_pending(&mut self) -> usize {
        self.pins.drain_pending() + self.strokes.drain_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShiftboardError;
    use crate::record::Payload;
    use crate::record::{Fields, NewRecord, StoredRecord};
    use crate::remote::{MemoryStore, SnapshotSink, Subscription};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn board(cache: &std::path::Path, remote: Option<MemoryStore>) -> AnnotationBoard<MemoryStore> {
        AnnotationBoard::open(
            Collection::of::<Pin>(),
            Collection::of::<Stroke>(),
            LocalCache::new(cache),
            remote,
        )
    }

    /// Memory store whose next stroke upload fails.
    #[derive(Clone)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_strokes: Arc<AtomicBool>,
    }

    impl RemoteStore for FlakyStore {
        async fn put(&self, collection: &Collection, record: NewRecord) -> ShiftboardResult<RecordId> {
            self.inner.put(collection, record).await
        }

        async fn update(&self, collection: &Collection, id: &RecordId, patch: Fields) -> ShiftboardResult<()> {
            self.inner.update(collection, id, patch).await
        }

        async fn delete(&self, collection: &Collection, id: &RecordId) -> ShiftboardResult<()> {
            self.inner.delete(collection, id).await
        }

        async fn clear_partition(&self, collection: &Collection, partition: &PartitionKey) -> ShiftboardResult<()> {
            self.inner.clear_partition(collection, partition).await
        }

        async fn replace_partition(
            &self,
            collection: &Collection,
            partition: &PartitionKey,
            records: Vec<StoredRecord>,
        ) -> ShiftboardResult<()> {
            if collection.name == Stroke::DEFAULT_COLLECTION && self.fail_strokes.swap(false, Ordering::SeqCst) {
                return Err(ShiftboardError::StoreUnavailable("connection reset".into()));
            }
            self.inner.replace_partition(collection, partition, records).await
        }

        fn subscribe(&self, collection: &Collection, partition: &PartitionKey, sink: SnapshotSink) -> Subscription {
            self.inner.subscribe(collection, partition, sink)
        }
    }

    fn line() -> Vec<Point> {
        vec![Point { x: 0.1, y: 0.1 }, Point { x: 0.4, y: 0.2 }]
    }

    #[tokio::test]
    async fn local_board_places_moves_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = board(dir.path(), None);
        board.open_map("alpha", "dust").unwrap();

        let pin = board.place("flash", 0.5, 0.5, 24.0).await.unwrap();
        board.move_to(&pin, 0.2, 0.8).await.unwrap();
        board.resize(&pin, 48.0).await.unwrap();
        board.draw(line(), "#ff0000", 3.0).await.unwrap();

        let placed = &board.pins()[0].payload;
        assert_eq!((placed.x, placed.y, placed.size), (0.2, 0.8, 48.0));
        assert_eq!(board.strokes().len(), 1);

        board.clear_all().await.unwrap();
        assert!(board.pins().is_empty());
        assert!(board.strokes().is_empty());
    }

    #[tokio::test]
    async fn maps_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = board(dir.path(), None);
        board.open_map("alpha", "dust").unwrap();
        board.place("smoke", 0.5, 0.5, 24.0).await.unwrap();

        board.open_map("alpha", "mirage").unwrap();
        assert!(board.pins().is_empty());
        board.open_map("bravo", "dust").unwrap();
        assert!(board.pins().is_empty());

        board.open_map("alpha", "dust").unwrap();
        assert_eq!(board.pins().len(), 1);
    }

    #[tokio::test]
    async fn rejects_out_of_bounds_annotations() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = board(dir.path(), None);
        board.open_map("alpha", "dust").unwrap();

        assert!(matches!(
            board.place("flash", 1.5, 0.5, 24.0).await,
            Err(ShiftboardError::InvalidInput(_))
        ));
        assert!(matches!(
            board.draw(Vec::new(), "#fff", 2.0).await,
            Err(ShiftboardError::InvalidInput(_))
        ));
        assert!(board.open_map("", "dust").is_err());
    }

    #[tokio::test]
    async fn failed_stroke_upload_leaves_board_local_and_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let flaky = FlakyStore {
            inner: store.clone(),
            fail_strokes: Arc::new(AtomicBool::new(true)),
        };

        let mut board = AnnotationBoard::open(
            Collection::of::<Pin>(),
            Collection::of::<Stroke>(),
            LocalCache::new(dir.path()),
            None,
        );
        board.open_map("alpha", "dust").unwrap();
        board.place("flash", 0.5, 0.5, 24.0).await.unwrap();
        board.draw(line(), "#00ff00", 2.0).await.unwrap();

        assert!(matches!(
            board.share(flaky.clone()).await,
            Err(ShiftboardError::StoreUnavailable(_))
        ));
        assert_eq!(board.mode(), Mode::Local);
        assert_eq!(store.listener_count(), 0);

        // Local mutations keep working on both collections.
        board.draw(line(), "#0000ff", 1.0).await.unwrap();
        assert_eq!(board.strokes().len(), 2);

        board.share(flaky).await.unwrap();
        board.settle().await;
        assert_eq!(board.mode(), Mode::Remote);
        assert_eq!(store.records(Pin::DEFAULT_COLLECTION).len(), 1);
        assert_eq!(store.records(Stroke::DEFAULT_COLLECTION).len(), 2);
        assert_eq!(board.pins().len(), 1);
        assert_eq!(board.strokes().len(), 2);
    }

    #[tokio::test]
    async fn shared_board_mirrors_both_collections() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();

        let mut mine = board(&dir.path().join("mine"), None);
        mine.open_map("alpha", "dust").unwrap();
        mine.place("flash", 0.5, 0.5, 24.0).await.unwrap();
        mine.draw(line(), "#00ff00", 2.0).await.unwrap();

        mine.share(store.clone()).await.unwrap();
        mine.settle().await;
        assert_eq!(mine.mode(), Mode::Remote);

        let mut theirs = board(&dir.path().join("theirs"), Some(store.clone()));
        theirs.open_map("alpha", "dust").unwrap();
        theirs.settle().await;
        assert_eq!(theirs.pins().len(), 1);
        assert_eq!(theirs.strokes().len(), 1);

        let stroke = theirs.strokes()[0].id.clone();
        theirs.erase(&stroke).await.unwrap();
        mine.drain_pending();
        assert!(mine.strokes().is_empty());
        assert_eq!(store.records(Stroke::DEFAULT_COLLECTION).len(), 0);
    }
}
