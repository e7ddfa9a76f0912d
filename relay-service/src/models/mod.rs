//! Domain models for the relay.

pub mod generation;
pub mod paper;

pub use generation::GenerationResult;
pub use paper::PaperRecord;
