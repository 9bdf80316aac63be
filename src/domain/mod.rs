pub mod load;
pub mod prediction;

pub use load::*;
pub use prediction::*;
