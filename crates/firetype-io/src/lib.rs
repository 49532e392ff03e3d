pub mod record;
pub mod dataset;
pub mod ingest;
pub mod persist;

pub use record::*;
pub use dataset::*;
pub use ingest::*;
pub use persist::*;
