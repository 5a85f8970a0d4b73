//! Entry extraction.

pub mod engine;

pub use engine::ExtractionEngine;
