pub mod deal;
pub mod enums;

pub use deal::*;
pub use enums::*;
