pub mod derive;
pub mod encoder;
pub mod engineer;

pub use derive::*;
pub use encoder::*;
pub use engineer::*;
