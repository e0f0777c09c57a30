//! Feature modules for flowmate
//!
//! Each module owns its state, key handling, and rendering.

pub mod funnel;
