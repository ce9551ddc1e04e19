//! Decoder for Spine 3.3–3.6 binary skeleton exports (`.skel`), unofficial.
//!
//! The decoder turns the binary export into a [`Document`] shaped like the Spine 3.x JSON
//! export, so it can be handed to any runtime that only understands the JSON flavour.
//! Atlas/texture loading and playback live elsewhere.

#![forbid(unsafe_code)]

mod animation;
mod binary;
mod error;
mod input;
mod model;
mod options;
mod version;

#[cfg(feature = "json")]
mod json;

pub use error::*;
pub use model::*;
pub use options::*;
pub use version::*;

#[cfg(test)]
mod test_writer;




#[cfg(test)]
mod animation_tests;
