//! Whereabouts Core Library
//!
//! Location privacy and live path tracking for Whereabouts. Lets users share
//! approximate whereabouts while controlling how much precision leaks, and
//! record a movement path whose stored points never exceed that precision.
//!
//! The main entry point is [`LocationEngine`], which wires together:
//! - [`location`]: obfuscation and encryption of coordinates
//! - [`settings`]: privacy settings, the emergency override, exposure scoring
//! - [`tracking`]: live recording, simplification and smoothing of paths
//! - [`storage`]: the persistent key-value store behind settings and sessions

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod config;
pub mod location;
pub mod logging;
pub mod settings;
pub mod storage;
pub mod tracking;

pub use api::LocationEngine;
pub use config::EngineConfig;
