//! Shared types for the pitwall live-timing service.

pub mod config;
pub mod error;
pub mod types;

pub use config::ServiceConfig;
pub use error::Error;
pub use types::{
    Driver, DriverTiming, HealthStatus, Interval, Lap, PitStop, Position, Session, Snapshot,
    Stint,
};
