//! # flaschen-mirror: remote display to pixel matrix bridge
//!
//! Runs a [`flaschen_core::MirrorSession`] fed by an upstream
//! [`source::EventSource`] and sends every commit to a Flaschen-Taschen
//! style matrix over UDP.
//!
//! ## Modes
//!
//! - **Pattern**: a built-in scrolling test pattern (`kind = "pattern"`).
//! - **Generate config**: print the default TOML (`--gen-config`).

pub mod config;
pub mod service;
pub mod source;
