//! ledlink Router
//!
//! The router is the relay between one embedded device and many observers:
//! - Tracks which connection is the device and which are observers
//! - Holds the shared switch state
//! - Routes LED commands from observers to the device
//! - Fans device events and state changes out to observers
//! - Cleans up and notifies observers when connections close
//!
//! # Example
//!
//! ```no_run
//! use ledlink_router::{Router, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Router::new(RouterConfig::default());
//!     router.serve_websocket("0.0.0.0:3000").await?;
//!     Ok(())
//! }
//! ```

pub mod connection;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod lifecycle;
pub mod registry;
pub mod relay;
pub mod router;
pub mod state;

pub use connection::{Connection, ConnectionId, Role};
pub use error::{Result, RouterError};
pub use registry::{Registry, Removal};
pub use relay::Relay;
pub use router::{Router, RouterConfig};
pub use state::SwitchStore;
