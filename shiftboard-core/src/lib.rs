//! Core of the shiftboard tools.
//!
//! Keeps an in-memory mirror of one partition of a keyed collection in sync
//! with either a remote realtime store or a local on-disk cache:
//! - `partition` derives partition keys (months, room/map pairs)
//! - `record` defines the typed records and their wire form
//! - `cache` and `remote` are the two stores
//! - `sync` holds the controller that ties them together
//! - `calendar` and `board` are the shift-calendar and map-annotation facades

pub mod board;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod constants;
pub mod error;
pub mod partition;
pub mod record;
pub mod remote;
pub mod sync;

pub use board::AnnotationBoard;
pub use cache::LocalCache;
pub use calendar::{Day, ShiftCalendar};
pub use config::Settings;
pub use error::{ShiftboardError, ShiftboardResult};
pub use partition::{CalendarDate, Month, PartitionKey};
pub use record::{Entry, Pin, PinPatch, Point, Record, RecordId, Stroke};
pub use remote::{FirebaseStore, MemoryStore, RemoteStore};
pub use sync::{Mode, Origin, SyncController, View};
