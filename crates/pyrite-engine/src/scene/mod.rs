//! Scene types.
//!
//! Responsibilities:
//! - store renderer-agnostic sprite records
//! - keep draw order identical to list order (painter's algorithm)

mod sprite;

pub use sprite::Sprite;
