pub mod browser;
pub mod error;
pub mod flow;
pub mod session;
pub mod webdriver;

#[cfg(test)]
mod fake;

pub use browser::*;
pub use error::*;
pub use flow::*;
pub use session::*;
pub use webdriver::*;
