//! Protocol version announced in the `connected` frame.

use serde::{Deserialize, Serialize};

/// Version spoken by this build.
pub const PROTOCOL_VERSION: Version = Version { major: 1, minor: 0 };

/// A `major.minor` protocol version. Clients should refuse a major they
/// do not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}
