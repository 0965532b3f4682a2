//! `mail2issue`: turns raw inbound email into issue-tracker posts.
//!
//! The core of the crate is [`parser::decode`], which takes the bytes of one
//! complete message and produces a [`model::email::ParsedEmail`]: a title, the
//! sender, a markdown body, and the decoded inline images. The [`publish`]
//! module wires that record to an image host, an issue tracker, and a chat
//! notifier through narrow traits.

pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod publish;

pub use parser::{decode, decode_with, DecodeOptions};
