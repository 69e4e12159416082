pub mod error;
pub mod models;
pub mod sink;

pub use error::*;
pub use models::*;
pub use sink::*;
