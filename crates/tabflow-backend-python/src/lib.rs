pub mod interpreter;
pub mod workflow;

pub use workflow::*;
