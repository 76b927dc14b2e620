pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ratelimit;
pub mod server;

pub use error::MurshidError;
