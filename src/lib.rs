//! Core library for resting-state cortical hub identification

pub mod cluster;
pub mod config;
pub mod data;
pub mod density;
pub mod error;
pub mod graph;
pub mod hubs;
pub mod pipeline;
pub mod process;
pub mod profile;
pub mod stats;
pub mod storage;
pub mod viz;

pub use error::{HubError, Result};
