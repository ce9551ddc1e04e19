use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported or invalid Spine version string: {value:?}")]
    UnsupportedVersion { value: Option<String> },

    #[error("unexpected EOF at offset {offset} (wanted {wanted} more byte(s))")]
    UnexpectedEof { offset: usize, wanted: usize },

    #[error("invalid {context} {value} at offset {offset}")]
    InvalidValue {
        context: &'static str,
        value: i64,
        offset: usize,
    },

    #[error("{kind} index {index} out of range (len={len}) at offset {offset}")]
    UnknownReference {
        kind: &'static str,
        index: usize,
        len: usize,
        offset: usize,
    },

    #[cfg(feature = "json")]
    #[error("failed to serialize skeleton document: {message}")]
    Json { message: String },
}
