//! Test helpers shared across Mizan crates.

pub mod embedder;
pub mod fixtures;

pub use embedder::{
    CountingEmbedder, EmptyEmbedder, GrowingEmbedder, StubEmbedder, UnavailableEmbedder,
};
pub use fixtures::record_fixture;
