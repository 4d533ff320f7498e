#![cfg_attr(not(test), no_std)]

//! Board support for the ESP32 "Cheap Yellow Display" (ILI9341 + XPT2046).

pub mod input;
pub mod network;
pub mod platform;
pub mod render;
pub mod storage;
