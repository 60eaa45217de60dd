//! Pediatric dosage: formula estimates and the label-versus-formula decision.

mod arbiter;
mod calculator;

pub use arbiter::*;
pub use calculator::*;
