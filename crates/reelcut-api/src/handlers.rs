//! Request handlers.

pub mod health;
pub mod upload;
pub mod videos;

pub use health::*;
pub use upload::*;
pub use videos::*;
