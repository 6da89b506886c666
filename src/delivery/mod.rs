//! Artifact assembly and delivery

pub mod adapter;
pub mod artifact;

pub use adapter::{DeliveryAdapter, DeliveryError};
pub use artifact::{artifact_filename, assemble, Artifact};
