//! Physical and architectural register pools.

pub mod dsp;
pub mod gp;

pub use dsp::{DspRegPool, EmitCtx};
pub use gp::{Evictor, PhysPool, SaveClass};
