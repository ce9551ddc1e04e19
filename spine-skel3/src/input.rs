//! Cursor over a `.skel` byte buffer and the scalar codecs of the format.

use crate::{BoneInfluence, Color, EofPolicy, Error, Vertices};
use byteorder::{BigEndian, ByteOrder};

#[derive(Clone, Debug)]
pub(crate) struct BinaryInput<'a> {
    bytes: &'a [u8],
    cursor: usize,
    eof_policy: EofPolicy,
}

impl<'a> BinaryInput<'a> {
    pub(crate) fn new(bytes: &'a [u8], eof_policy: EofPolicy) -> Self {
        Self {
            bytes,
            cursor: 0,
            eof_policy,
        }
    }

    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.cursor)
    }

    /// Upper bound for pre-allocating `count` elements; every element takes at least one byte.
    pub(crate) fn capacity(&self, count: usize) -> usize {
        count.min(self.remaining())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, Error> {
        match self.bytes.get(self.cursor) {
            Some(&b) => {
                self.cursor += 1;
                Ok(b)
            }
            None => match self.eof_policy {
                EofPolicy::Strict => Err(Error::UnexpectedEof {
                    offset: self.cursor,
                    wanted: 1,
                }),
                EofPolicy::ZeroFill => {
                    self.cursor += 1;
                    Ok(0)
                }
            },
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if self.eof_policy == EofPolicy::Strict && self.remaining() < N {
            return Err(Error::UnexpectedEof {
                offset: self.cursor,
                wanted: N - self.remaining(),
            });
        }
        let mut out = [0u8; N];
        for b in &mut out {
            *b = self.read_u8()?;
        }
        Ok(out)
    }

    pub(crate) fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.read_u8()? != 0)
    }

    pub(crate) fn read_u16_be(&mut self) -> Result<u16, Error> {
        Ok(BigEndian::read_u16(&self.read_array::<2>()?))
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn read_i32_be(&mut self) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(&self.read_array::<4>()?))
    }

    /// Reads a 1–5 byte varint (7 bits per byte, least significant group first).
    ///
    /// With `optimize_positive` the accumulated bits are returned as-is (values above
    /// `i32::MAX` wrap); otherwise they are zig-zag decoded.
    pub(crate) fn read_varint(&mut self, optimize_positive: bool) -> Result<i32, Error> {
        let mut b = self.read_u8()?;
        let mut value: u32 = (b & 0x7F) as u32;
        if (b & 0x80) != 0 {
            b = self.read_u8()?;
            value |= ((b & 0x7F) as u32) << 7;
            if (b & 0x80) != 0 {
                b = self.read_u8()?;
                value |= ((b & 0x7F) as u32) << 14;
                if (b & 0x80) != 0 {
                    b = self.read_u8()?;
                    value |= ((b & 0x7F) as u32) << 21;
                    if (b & 0x80) != 0 {
                        b = self.read_u8()?;
                        value |= ((b & 0x7F) as u32) << 28;
                    }
                }
            }
        }

        if optimize_positive {
            Ok(value as i32)
        } else {
            Ok((value >> 1) as i32 ^ -((value & 1) as i32))
        }
    }

    /// Positive-optimized varint used as a count or an index.
    pub(crate) fn read_len(&mut self) -> Result<usize, Error> {
        Ok(self.read_varint(true)? as u32 as usize)
    }

    pub(crate) fn read_f32_be(&mut self) -> Result<f32, Error> {
        Ok(f32_from_be_bits(BigEndian::read_u32(&self.read_array::<4>()?)))
    }

    pub(crate) fn read_f32_array(&mut self, count: usize, scale: f32) -> Result<Vec<f32>, Error> {
        let mut out = Vec::with_capacity(self.capacity(count));
        if scale == 1.0 {
            for _ in 0..count {
                out.push(self.read_f32_be()?);
            }
        } else {
            for _ in 0..count {
                out.push(self.read_f32_be()? * scale);
            }
        }
        Ok(out)
    }

    pub(crate) fn read_vertices(&mut self, vertex_count: usize, scale: f32) -> Result<Vertices, Error> {
        if !self.read_bool()? {
            return Ok(Vertices::Unweighted(
                self.read_f32_array(vertex_count << 1, scale)?,
            ));
        }

        let mut weighted = Vec::with_capacity(self.capacity(vertex_count));
        for _ in 0..vertex_count {
            let bone_count = self.read_len()?;
            let mut influences = Vec::with_capacity(self.capacity(bone_count));
            for _ in 0..bone_count {
                let bone = self.read_len()?;
                let x = self.read_f32_be()? * scale;
                let y = self.read_f32_be()? * scale;
                let weight = self.read_f32_be()?;
                influences.push(BoneInfluence { bone, x, y, weight });
            }
            weighted.push(influences);
        }
        Ok(Vertices::Weighted(weighted))
    }

    pub(crate) fn read_u16_array(&mut self) -> Result<Vec<u16>, Error> {
        let n = self.read_len()?;
        let mut out = Vec::with_capacity(self.capacity(n));
        for _ in 0..n {
            out.push(self.read_u16_be()?);
        }
        Ok(out)
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub(crate) fn read_varint_array(&mut self) -> Result<Vec<i32>, Error> {
        let n = self.read_len()?;
        let mut out = Vec::with_capacity(self.capacity(n));
        for _ in 0..n {
            out.push(self.read_varint(true)?);
        }
        Ok(out)
    }

    pub(crate) fn read_color(&mut self) -> Result<Color, Error> {
        Ok(Color(self.read_array::<4>()?))
    }

    /// Reads a length-prefixed modified UTF-8 string.
    ///
    /// The prefix is `byte_len + 1`; `0` is an absent string and `1` the empty string. Lead bytes
    /// `0xC_`/`0xD_` start a 2-byte unit, `0xE_` a 3-byte unit, anything else is one unit taken
    /// verbatim. Units are UTF-16 code units, so surrogate pairs written as two 3-byte sequences
    /// combine into one `char`.
    pub(crate) fn read_string(&mut self) -> Result<Option<String>, Error> {
        let length = self.read_len()?;
        match length {
            0 => return Ok(None),
            1 => return Ok(Some(String::new())),
            _ => {}
        }
        let byte_len = length - 1;
        if self.eof_policy == EofPolicy::Strict && self.remaining() < byte_len {
            return Err(Error::UnexpectedEof {
                offset: self.cursor,
                wanted: byte_len - self.remaining(),
            });
        }

        let mut units: Vec<u16> = Vec::with_capacity(self.capacity(byte_len));
        let mut consumed = 0usize;
        while consumed < byte_len {
            let b = self.read_u8()?;
            match b >> 4 {
                12 | 13 => {
                    let b2 = self.read_u8()?;
                    units.push((((b & 0x1F) as u16) << 6) | (b2 & 0x3F) as u16);
                    consumed += 2;
                }
                14 => {
                    let b2 = self.read_u8()?;
                    let b3 = self.read_u8()?;
                    units.push(
                        (((b & 0x0F) as u16) << 12)
                            | (((b2 & 0x3F) as u16) << 6)
                            | (b3 & 0x3F) as u16,
                    );
                    consumed += 3;
                }
                _ => {
                    units.push(b as u16);
                    consumed += 1;
                }
            }
        }
        Ok(Some(String::from_utf16_lossy(&units)))
    }
}

/// Rebuilds an IEEE-754 binary32 value from its bit pattern field by field.
///
/// All intermediate values are exact in `f64`, so the result is bit-identical to
/// `f32::from_bits` for every non-NaN pattern.
pub(crate) fn f32_from_be_bits(bits: u32) -> f32 {
    let negative = (bits & 0x8000_0000) != 0;
    let exponent = ((bits >> 23) & 0xFF) as i32;
    let significand = bits & 0x007F_FFFF;

    let magnitude = match exponent {
        0xFF if significand == 0 => f64::INFINITY,
        0xFF => f64::NAN,
        // Subnormal (and zero): no implicit leading one, fixed exponent of -126.
        0 => significand as f64 / (1u32 << 23) as f64 * 2f64.powi(-126),
        _ => (1.0 + significand as f64 / (1u32 << 23) as f64) * 2f64.powi(exponent - 127),
    };

    let magnitude = magnitude as f32;
    if negative { -magnitude } else { magnitude }
}
