//! # Plugin configuration
//! Compile-time defaults generated by `build.rs` from `config/plugin.json`.

include!(concat!(env!("OUT_DIR"), "/plugin_config.rs"));
