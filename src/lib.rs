//! # Quick Alarm
//! An alarm clock face for hardware button decks. Every key showing the face is an instance with
//! its own alarm: a press arms it, snoozes it or dismisses it, and the key is redrawn with the
//! alarm time and an animated clock while the alarm rings.
//!
//! The host device runtime owns the keys and the persisted settings; this crate only reacts to
//! its events and answers with images and settings.

pub mod config;
pub mod error;
pub mod event;
pub mod state;
pub mod task;
pub mod utility;

pub use error::{Error, Result};
