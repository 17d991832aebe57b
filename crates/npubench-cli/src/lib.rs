pub mod cli;
pub mod driver;
pub mod sessions;

pub use driver::{run, RunConfig, RunSummary};
pub use sessions::AcceleratorSession;
