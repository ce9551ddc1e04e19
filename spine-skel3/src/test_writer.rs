//! Builds synthetic `.skel` streams for tests.

#![allow(dead_code)]

#[derive(Default)]
pub(crate) struct SkelWriter {
    bytes: Vec<u8>,
}

impl SkelWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn finish(self) -> Vec<u8> {
        self.bytes
    }

    pub(crate) fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub(crate) fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(v as u8)
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        self.raw(&v.to_be_bytes())
    }

    pub(crate) fn i32(&mut self, v: i32) -> &mut Self {
        self.raw(&v.to_be_bytes())
    }

    pub(crate) fn f32(&mut self, v: f32) -> &mut Self {
        self.raw(&v.to_bits().to_be_bytes())
    }

    pub(crate) fn varint_u32(&mut self, mut v: u32) -> &mut Self {
        loop {
            let b = (v & 0x7F) as u8;
            v >>= 7;
            if v == 0 {
                self.bytes.push(b);
                return self;
            }
            self.bytes.push(b | 0x80);
        }
    }

    pub(crate) fn varint(&mut self, v: i32, optimize_positive: bool) -> &mut Self {
        if optimize_positive {
            self.varint_u32(v as u32)
        } else {
            self.varint_u32(((v << 1) ^ (v >> 31)) as u32)
        }
    }

    /// Positive-optimized varint (counts and indices).
    pub(crate) fn len(&mut self, v: usize) -> &mut Self {
        self.varint_u32(v as u32)
    }

    pub(crate) fn color(&mut self, rgba: [u8; 4]) -> &mut Self {
        self.raw(&rgba)
    }

    /// Modified UTF-8: one UTF-16 code unit per 1-3 byte sequence.
    pub(crate) fn string(&mut self, s: Option<&str>) -> &mut Self {
        let Some(s) = s else {
            return self.len(0);
        };
        let mut encoded = Vec::new();
        for unit in s.encode_utf16() {
            match unit {
                0x0001..=0x007F => encoded.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    encoded.push(0xC0 | (unit >> 6) as u8);
                    encoded.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    encoded.push(0xE0 | (unit >> 12) as u8);
                    encoded.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    encoded.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }
        self.len(encoded.len() + 1);
        self.raw(&encoded)
    }

    pub(crate) fn str(&mut self, s: &str) -> &mut Self {
        self.string(Some(s))
    }

    /// Header up to and including the nonessential flag (no fps/images).
    pub(crate) fn header(&mut self, version: &str, width: f32, height: f32) -> &mut Self {
        self.str("").str(version).f32(width).f32(height).bool(false)
    }

    /// One bone named `name` with the identity transform, for any minor version.
    pub(crate) fn default_bone(&mut self, name: &str, parent: Option<usize>, minor: u32) -> &mut Self {
        self.str(name);
        if let Some(parent) = parent {
            self.len(parent);
        }
        self.f32(0.0) // rotation
            .f32(0.0) // x
            .f32(0.0) // y
            .f32(1.0) // scaleX
            .f32(1.0) // scaleY
            .f32(0.0) // shearX
            .f32(0.0) // shearY
            .f32(0.0); // length
        if minor >= 5 {
            self.len(0)
        } else {
            self.bool(true).bool(true)
        }
    }

    /// Slot with white color(s), no attachment and normal blending.
    pub(crate) fn default_slot(&mut self, name: &str, bone: usize, minor: u32) -> &mut Self {
        self.str(name).len(bone).color([0xFF; 4]);
        if minor >= 6 {
            self.color([0xFF; 4]);
        }
        self.string(None).len(0)
    }
}
