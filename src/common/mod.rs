//! Common types and utilities shared across spillqueue.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants and [`BufferConfig`](config::BufferConfig)
//! - Error types
//! - The frame codec every store writes with

pub mod config;
pub mod error;
pub mod frame;

pub use error::{Error, Result};
