pub mod error;
pub mod id;
pub mod item;
pub mod state;
pub mod store;
pub mod storage;
pub mod persistence;
pub mod autosave;
pub mod session;
pub mod config;
pub mod logging;

pub use error::{ListError, StorageError, ValidationError};
pub use id::{IdGenerator, SequentialIds, UuidIds};
pub use item::{Item, MAX_NAME_LEN};
pub use state::{Action, Effect, ListState};
pub use store::{ListStore, Snapshot};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use persistence::{ListPersistence, DEFAULT_STORAGE_KEY};
pub use autosave::{AutoSaver, SaveEvent, SaveOptions};
pub use session::{SessionOptions, ShoppingSession};
pub use config::{Config, ConfigManager, Scope};
