//! depotdb - typed records over an ordered key-value store, with streaming
//! gzip backup and restore
//!
//! ```ignore
//! use depotdb::{BackupManager, BackupOptions, Db, DbOptions, StoreLocation};
//!
//! let db: Db<User> = Db::open(StoreLocation::Memory, DbOptions::default())?;
//! db.put(&user)?;
//! BackupManager::backup_to_path(&db, Path::new("users.gz"), &BackupOptions::default())?;
//! ```

pub mod backup;
pub mod cli;
pub mod codec;
pub mod error;
pub mod executor;
pub mod observability;
pub mod restore;
pub mod storage;

pub use backup::{BackupManager, BackupOptions, BackupSummary};
pub use error::{DbError, DbResult};
pub use executor::{FindResult, Query};
pub use restore::{RestoreManager, RestoreOptions, RestoreSummary};
pub use storage::{Db, DbOptions, Key, Storable, StoreLocation};
