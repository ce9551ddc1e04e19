//! Supported Spine export versions and the field-presence gates they imply.

use crate::Error;

/// Spine major version understood by the binary decoder.
pub const SPINE_EXPORT_MAJOR: u32 = 3;

/// Oldest supported minor version.
pub const SPINE_EXPORT_MINOR_MIN: u32 = 3;

/// Newest supported minor version.
pub const SPINE_EXPORT_MINOR_MAX: u32 = 6;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SpineVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: Option<u32>,
}

impl SpineVersion {
    /// Parses `major.minor[.patch]` and rejects anything outside 3.3–3.6.
    ///
    /// Only the leading digits of the patch component are considered, so editor builds such as
    /// `3.6.53` and `3.5.51-beta` both parse.
    pub fn parse(value: &str) -> Result<Self, Error> {
        let invalid = || Error::UnsupportedVersion {
            value: Some(value.to_string()),
        };

        let mut parts = value.trim().split('.');
        let major: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let patch = parts.next().and_then(|p| {
            let digits = p.bytes().take_while(u8::is_ascii_digit).count();
            p[..digits].parse().ok()
        });

        let version = Self {
            major,
            minor,
            patch,
        };
        if !version.is_supported() {
            return Err(invalid());
        }
        Ok(version)
    }

    pub fn is_supported(&self) -> bool {
        self.major == SPINE_EXPORT_MAJOR
            && (SPINE_EXPORT_MINOR_MIN..=SPINE_EXPORT_MINOR_MAX).contains(&self.minor)
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities::for_minor(self.minor)
    }
}

/// Optional fields present in the stream for a given minor version.
///
/// The binary format carries no per-field flags; presence is implied by the exporter version.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Capabilities {
    /// Constraints carry an explicit `order`.
    pub constraint_order: bool,
    /// Bones carry a transform mode instead of `inheritRotation`/`inheritScale`.
    pub bone_transform_mode: bool,
    /// Nonessential header carries `fps`.
    pub frame_rate: bool,
    /// Slots carry a second (dark) tint color.
    pub slot_dark_color: bool,
    /// Transform constraints carry `local` and `relative`.
    pub transform_local_relative: bool,
}

impl Capabilities {
    pub fn for_minor(minor: u32) -> Self {
        Self {
            constraint_order: minor >= 5,
            bone_transform_mode: minor >= 5,
            frame_rate: minor >= 5,
            slot_dark_color: minor >= 6,
            transform_local_relative: minor == 6,
        }
    }
}
