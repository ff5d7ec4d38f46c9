//! Persistence module split across logical submodules.

pub mod connection;
pub mod instances;
pub mod navigation;
pub mod permissions;

pub use connection::{data_root, ensure_schema, open_in_memory};
pub use instances::{create_or_update, fetch_instances, get_instance, InstanceParams, SavedInstance};
pub use navigation::{navigation_list, reset_navigation_cache, MenuRow};
