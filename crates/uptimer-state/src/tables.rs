//! redb table definitions for the uptimer state store.

use redb::TableDefinition;

/// Singleton documents keyed by name. Values are JSON.
pub const DOCUMENTS: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Key of the monitor config document in [`DOCUMENTS`].
pub const MONITOR_CONFIG_KEY: &str = "monitor_config";
