//! placenoter-notes: the notes side of PlaceNoter.
//!
//! This crate provides:
//! - `Note`, `QuickLink`, `Preferences` - the persisted records
//! - `NoteStore` - collections, the active note, pins and quick links, with
//!   subscriber notification and debounced writes
//! - `KeyValueStore` - the storage seam, with `MemoryStore` and
//!   `JsonFileStore`
//! - `transfer` - export files and validated import

pub mod config;
pub mod debounce;
pub mod error;
pub mod note;
pub mod preferences;
pub mod storage;
pub mod store;
pub mod sync;
pub mod telemetry;
pub mod transfer;

pub use config::SyncConfig;
pub use debounce::Debouncer;
pub use error::{ConfigError, ImportError, NotesError, QuickLinkError, StorageError};
pub use note::{Note, QuickLink};
pub use preferences::{Preferences, Theme};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use store::{CollectionEdit, NoteStore, Slot, StoreEvent, SubscriptionId};
pub use sync::Collection;
pub use transfer::ExportData;
