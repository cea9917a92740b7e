pub mod command;
pub mod error;
pub mod secrets;
pub mod ses;

pub use command::*;
pub use error::*;
pub use secrets::*;
pub use ses::*;
