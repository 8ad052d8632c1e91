mod args;
mod descriptor;
mod report;

// re-export the public interface
pub use args::*;
pub use descriptor::*;
pub use report::*;
