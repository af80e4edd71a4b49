pub mod exporter;
pub mod families;
pub mod server;

pub use exporter::*;
pub use families::*;
pub use server::*;
