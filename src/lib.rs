pub mod config;
pub mod error;
pub mod events;
pub mod placeholder;
pub mod preferences;
pub mod puzzle;
pub mod session;
pub mod terminal;
pub mod tasks {
    pub mod files;
    pub mod loader;
    pub mod prefetch;
}

pub use error::{Error, Result};
