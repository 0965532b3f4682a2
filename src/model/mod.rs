//! Core data model types: the decoded email, its sender, and its images.

pub mod address;
pub mod attachment;
pub mod email;
