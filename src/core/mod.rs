pub mod config;
pub mod config_loader;
pub mod context;
pub mod error;
pub mod poll;
pub mod state_machine;
pub mod traits;

pub use config::*;
pub use config_loader::*;
pub use context::*;
pub use error::*;
pub use poll::*;
pub use state_machine::*;
pub use traits::*;
