pub mod scaler;
pub mod split;
pub mod balance;
pub mod select;

pub use scaler::*;
pub use split::*;
pub use balance::*;
pub use select::*;
