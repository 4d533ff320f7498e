#![cfg_attr(not(test), no_std)]

//! Board-independent core of the rawpager firmware.
//!
//! Everything here runs on the host under `cargo test`: page layout,
//! navigation history, refresh scheduling, input classification, the
//! settings model and the captive-portal protocol handlers.

extern crate alloc;

pub mod app;
pub mod clock;
pub mod input;
pub mod layout;
pub mod navigation;
pub mod portal;
pub mod refresh;
pub mod render;
pub mod settings;
pub mod text_policy;
pub mod text_store;
