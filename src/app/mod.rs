pub mod context;
pub mod error;

pub use context::GatewayContext;
pub use error::{GatewayError, Result};
