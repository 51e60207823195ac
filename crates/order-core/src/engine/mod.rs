//! Intérprete de pasos: la máquina virtual de recetas.

mod core;

pub use core::{EngineConfig, StepEngine};
