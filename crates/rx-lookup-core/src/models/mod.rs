//! Domain models for the lookup and dosage pipeline.

mod dosage;
mod lookup;
mod matching;
mod product;

pub use dosage::*;
pub use lookup::*;
pub use matching::*;
pub use product::*;
