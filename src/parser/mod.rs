//! Email decoding: byte normalization, header splitting, MIME part walking,
//! body selection, HTML-to-markdown conversion, and image extraction.
//!
//! Everything here is a pure function of the input bytes. Malformed input
//! degrades the result instead of returning an error.

pub mod attachment;
pub mod body;
pub mod codec;
pub mod header;
pub mod html;
pub mod message;
pub mod mime;
pub mod text;

pub use message::{decode, decode_reader, decode_with, DecodeOptions};
