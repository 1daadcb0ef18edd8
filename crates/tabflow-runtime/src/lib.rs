pub mod config;
pub mod instance;
pub mod lifecycle;
pub mod materialize;
pub mod model;
pub mod registry;
pub mod request;

pub use config::*;
pub use instance::*;
pub use lifecycle::*;
pub use materialize::*;
pub use model::*;
pub use registry::*;
pub use request::*;
