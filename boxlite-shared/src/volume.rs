//! Volume descriptions exchanged with the guest attachment layer.

use serde::{Deserialize, Serialize};

/// How a prepared container's storage is attached to the guest.
///
/// Produced by the host storage backend on every preparation and consumed
/// right away by the attachment layer. It is never persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeDescriptor {
    /// Guest-visible mount label, unique per container
    pub name: String,
    /// Host path or host device path
    pub source: String,
    /// Filesystem type the guest mounts (e.g. "dir", "xfs")
    pub fstype: String,
    /// Transport hint (e.g. "vfs" for a shared directory, "raw" for a block device)
    pub format: String,
    /// Enforced by the attachment layer, not by the host backend
    #[serde(default)]
    pub read_only: bool,
}

/// A user volume request.
///
/// The caller supplies `name`; a successful `create_volume` fills in
/// `source`, `fstype` and `format` so the record describes itself and can be
/// persisted as-is.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserVolume {
    pub name: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub fstype: String,
    #[serde(default)]
    pub format: String,
}

impl UserVolume {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether a backend has already resolved this volume to host storage.
    pub fn is_resolved(&self) -> bool {
        !self.source.is_empty()
    }
}
