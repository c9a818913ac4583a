pub mod market;
pub mod proposal;
pub mod round;

pub use market::*;
pub use proposal::*;
pub use round::*;
