pub mod download;
pub mod gateway;
pub mod handlers;
pub mod reachability;
pub mod replicate;
pub mod router;
pub mod types;
pub mod validation;

pub use router::{download_router, videogen_router};
