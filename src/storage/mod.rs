pub mod prefs;
pub mod sqlite;

pub use self::prefs::PrefsStorage;
pub use self::sqlite::{format_size, KvStore, Namespace, StorageUsage};
