//! Constants for the BoxLite storage layer
//!
//! Centralized location for hardcoded values, modes and defaults.

// Re-export the values shared with the guest attachment layer
pub use boxlite_shared::constants::{drivers, formats, fstypes};

pub mod envs {
    /// Overrides the storage root directory
    pub const BOXLITE_STORAGE_ROOT: &str = "BOXLITE_STORAGE_ROOT";
}

/// Raw block image defaults
pub mod block {
    /// Default size of a freshly created volume image (sparse)
    pub const DEFAULT_VOLUME_SIZE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

    /// Filesystem raw block images are formatted with
    pub const DEFAULT_FSTYPE: &str = super::fstypes::XFS;

    /// Mount option that makes mount(8) set up an auto-clear loop device
    pub const LOOP_OPTION: &str = "loop";
}

/// Permission bits for directories the backends create
pub mod modes {
    /// Raw block volume images directory (owner only)
    pub const VOLUMES_DIR: u32 = 0o700;

    /// Directory volumes and intermediate directories
    pub const SHARED_DIR: u32 = 0o755;
}
