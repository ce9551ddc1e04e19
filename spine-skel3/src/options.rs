/// What a read past the end of the input buffer does.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum EofPolicy {
    /// Fail with [`crate::Error::UnexpectedEof`].
    #[default]
    Strict,
    /// Yield zero bytes and keep going, matching the behaviour of older web loaders that
    /// tolerate truncated exports. Only use this on trusted input: a corrupt length prefix is
    /// honoured byte by byte.
    ZeroFill,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DecodeOptions {
    /// Uniform multiplier for every length-valued field (positions, lengths, sizes, offsets).
    pub scale: f32,
    pub eof_policy: EofPolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            eof_policy: EofPolicy::Strict,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_eof_policy(mut self, eof_policy: EofPolicy) -> Self {
        self.eof_policy = eof_policy;
        self
    }

    pub(crate) fn effective_scale(&self) -> f32 {
        if self.scale.is_finite() && self.scale > 0.0 {
            self.scale
        } else {
            1.0
        }
    }
}
