pub mod bench;
pub mod classify;
pub mod labels;
pub mod preprocess;

pub use bench::*;
pub use classify::*;
pub use labels::*;
pub use preprocess::*;
