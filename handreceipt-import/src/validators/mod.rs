//! Item validation layer
//!
//! Classifies parsed items and expanded units before anything is written.

pub mod item_validator;

pub use item_validator::{ItemValidator, StructuralVerdict, UnitVerdict, MALFORMED_NSN};
