//! Administrative JSON model and conversion options

mod handler;
mod loader;
mod types;

pub use handler::*;
pub use loader::{ConvertOptions, DEFAULT_SERVER_NAME};
pub use types::*;
