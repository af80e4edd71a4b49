pub mod config;
pub mod descriptor;
pub mod error;
pub mod property;
pub mod row;
pub mod sample;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use property::*;
pub use row::*;
pub use sample::*;
