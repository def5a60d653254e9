pub mod config;
pub mod dispatch;
pub mod error;
pub mod image;
pub mod io;
pub mod manifest;
pub mod paths;
pub mod pipeline;
pub mod stamp;
pub mod target;
pub mod template;

pub use error::{Result, RolloutError};
