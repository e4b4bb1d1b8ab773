//! API clients for external services
//!
//! - Dramabox: drama catalog, search and episode streams

pub mod dramabox;

pub use dramabox::{DramaboxClient, DramaboxError, UpstreamResponse};
