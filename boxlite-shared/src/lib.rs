//! BoxLite Shared - types used by the host storage layer and the guest
//! attachment layer.
//!
//! This crate contains the volume descriptors handed across the host-guest
//! boundary, the constants both sides agree on, and the storage error type.

pub mod constants;
pub mod errors;
pub mod volume;

pub use errors::{ErrorKind, StorageError, StorageResult};
pub use volume::{UserVolume, VolumeDescriptor};
