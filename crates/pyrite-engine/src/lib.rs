//! Pyrite engine crate.
//!
//! This crate owns the platform + GPU runtime pieces used by sprite apps.

pub mod device;
pub mod window;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod scene;
pub mod atlas;
pub mod render;
