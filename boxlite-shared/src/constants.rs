//! Shared constants between host and guest
//!
//! These values are the contract with the guest attachment layer and must be
//! identical on both sides of the host-guest boundary.

/// Transport hints understood by the guest attachment layer.
pub mod formats {
    /// Directory shared with the guest over the virtual filesystem channel
    pub const VFS: &str = "vfs";

    /// Image attached to the guest as a raw block device
    pub const RAW: &str = "raw";
}

/// Filesystem types the guest is asked to mount.
pub mod fstypes {
    /// Plain directory, no filesystem driver involved
    pub const DIR: &str = "dir";

    /// XFS, the default filesystem of raw block images
    pub const XFS: &str = "xfs";
}

/// Storage driver names reported by the host.
pub mod drivers {
    pub const OVERLAY: &str = "overlay";
    pub const RAWBLOCK: &str = "rawblock";
}
