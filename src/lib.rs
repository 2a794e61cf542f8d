//! Locates the timestamp at which a short reference clip (an intro or
//! outro) occurs inside a much longer target stream, using only acoustic
//! content so the match survives re-encoding.
//!
//! A coarse scan streams overlapping windows of the target, correlates
//! each window's chromagram against the reference, and hands promising
//! hits to a bounded fine-grained refinement pass. Decoding sits behind
//! the [`audio::decode::Decoder`] trait so the search can be driven by a
//! synthetic in-memory decoder in tests.

pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod hash;
pub mod search;
pub mod sink;

pub use audio::chroma::ChromaExtractor;
pub use audio::decode::{AudioBuffer, Decoder, FfmpegDecoder};
pub use audio::source::AudioSource;
pub use config::Config;
pub use error::DetectError;
pub use search::controller::{SearchController, SearchOutcome};
