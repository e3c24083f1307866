//! `contentFeatures.dlna.org` header values.

use std::fmt;

/// Default `DLNA.ORG_FLAGS`: streaming transfer mode, background transfer
/// mode, connection stall and DLNA v1.5, followed by the reserved zero bits.
pub const DEFAULT_FLAGS: &str = "01700000000000000000000000000000";

/// Capabilities advertised for one response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContentFeatures {
    /// DLNA profile name (`DLNA.ORG_PN`), omitted when empty.
    pub profile_name: String,
    /// Whether `TimeSeekRange.dlna.org` requests are honoured.
    pub support_time_seek: bool,
    /// Whether HTTP `Range` requests are honoured.
    pub support_range: bool,
    /// Whether the content is converted from its source (`DLNA.ORG_CI`).
    pub transcoded: bool,
    /// Override for `DLNA.ORG_FLAGS`; [`DEFAULT_FLAGS`] when `None`.
    pub flags: Option<String>,
}

/// Formats as `DLNA.ORG_PN=..;DLNA.ORG_OP=ab;DLNA.ORG_CI=c;DLNA.ORG_FLAGS=..`.
///
/// The operations field is two binary digits (time seek, byte range).
impl fmt::Display for ContentFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.profile_name.is_empty() {
            write!(f, "DLNA.ORG_PN={};", self.profile_name)?;
        }
        let flags = match self.flags.as_deref() {
            Some(flags) if !flags.is_empty() => flags,
            _ => DEFAULT_FLAGS,
        };
        write!(
            f,
            "DLNA.ORG_OP={}{};DLNA.ORG_CI={};DLNA.ORG_FLAGS={}",
            u8::from(self.support_time_seek),
            u8::from(self.support_range),
            u8::from(self.transcoded),
            flags
        )
    }
}
