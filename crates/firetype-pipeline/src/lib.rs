pub mod config;
pub mod family;
pub mod cv;
pub mod trainer;
pub mod tuner;
pub mod artifact;
pub mod evaluator;
pub mod pipeline;

pub use config::*;
pub use family::*;
pub use cv::*;
pub use trainer::*;
pub use tuner::*;
pub use artifact::*;
pub use evaluator::*;
pub use pipeline::*;
