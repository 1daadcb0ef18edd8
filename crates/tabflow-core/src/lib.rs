pub mod dtype;
pub mod error;
pub mod strings;
pub mod tensor;
pub mod view;
pub mod workflow;

pub use dtype::*;
pub use error::*;
pub use strings::*;
pub use tensor::*;
pub use view::*;
pub use workflow::*;
