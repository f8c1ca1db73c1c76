//! Registry of headless site projects and the credentials used to reach the
//! upstream provider on their behalf.

pub mod config;
pub mod metrics_defs;
pub mod registry;
pub mod store;
pub mod types;

pub use registry::{ProjectRegistry, RegistryError};
pub use store::{FilesystemProjectStore, ProjectStore, StoreError};
pub use types::Project;
