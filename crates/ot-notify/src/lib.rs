pub mod error;
pub mod sink;
pub mod templates;
pub mod types;

pub use error::*;
pub use sink::*;
pub use templates::*;
pub use types::*;
