//! Tasks that make up the plugin as well as the state they drive.
pub mod alarm_settings;
pub mod alarm_trigger;
pub mod animation;
pub mod display;
pub mod host_bridge;
pub mod instance;
pub mod orchestrate;
pub mod sound;
