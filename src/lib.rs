//! Occupancy layout for the warehouse monitoring dashboard.
//!
//! The core is [`layout::compute_placements`]: a deterministic shelf packer
//! that turns material category volumes into non-overlapping boxes inside a
//! warehouse. The remaining modules wrap it in an HTTP service.

pub mod api;
pub mod config;
pub mod diagnostics;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod types;
