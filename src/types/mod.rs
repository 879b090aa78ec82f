pub mod loan;
pub mod prediction;

pub use loan::*;
pub use prediction::*;
