pub mod context;
pub mod projector;
pub mod report;

pub use context::*;
pub use projector::*;
pub use report::*;
