//! Gridstep
//!
//! Fixed-timestep entity simulation core: a uniform-grid broad phase,
//! AABB collision resolution, per-entity behaviors and an accumulator
//! scheduler that decouples simulation rate from draw rate.

pub mod config;
pub mod util;
pub mod game;
