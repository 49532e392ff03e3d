pub mod matrix;
pub mod label;
pub mod classifier;
pub mod reject;
pub mod error;

pub use matrix::FeatureMatrix;
pub use label::{ClassLabels, FireType};
pub use classifier::Classifier;
pub use reject::RejectedRecords;
pub use error::{FireError, FireResult};
