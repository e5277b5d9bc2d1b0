//! This build script turns `config/plugin.json` into `plugin_config.rs` in `OUT_DIR`,
//! so the plugin defaults (sound file, snooze, render size, tick rates and the sound
//! player command line for the target OS) are compiled in as constants.
//! A missing config file falls back to the built-in values below.

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::print_stdout)]

use std::{
    env, fs,
    fs::File,
    io,
    io::Write,
    path::Path,
};

/// Used when `config/plugin.json` does not exist
const FALLBACK_CONFIG: &str = r#"{
  "alarm": {"default_sound": "alarms/TimTaj_Go_Motivate_Yourself.mp3", "default_snooze_minutes": 5, "ring_timeout_secs": 300},
  "render": {"image_size": 72, "text_oversample": 1.3},
  "timing": {"alarm_check_ms": 1000, "animation_ms": 30},
  "player": {
    "macos": ["afplay", "{file}", "-v", "2"],
    "linux": ["paplay", "{file}"],
    "windows": ["powershell", "-ExecutionPolicy", "Bypass", "-File", "sounds/PlaySound.ps1", "{file}"]
  }
}"#;

fn main() {
    println!("cargo:rerun-if-changed=config/plugin.json");
    plugin_config().unwrap();
}

/// Generate `plugin_config.rs` from `plugin.json`
fn plugin_config() -> io::Result<()> {
    let out_dir = env::var("OUT_DIR").expect("OUT_DIR environment variable not set");
    let dest_path = Path::new(&out_dir).join("plugin_config.rs");
    let mut f = File::create(dest_path).expect("Could not create plugin_config.rs file");

    let manifest_dir = env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR environment variable not set");
    let config_path = Path::new(&manifest_dir).join("config/plugin.json");
    let config_contents = if config_path.exists() {
        fs::read_to_string(config_path).expect("Could not read plugin.json file")
    } else {
        println!("plugin.json not found, using built-in defaults");
        FALLBACK_CONFIG.to_string()
    };

    let config: serde_json::Value = serde_json::from_str(&config_contents).expect("Could not parse plugin.json file");

    let default_sound = config["alarm"]["default_sound"]
        .as_str()
        .expect("alarm.default_sound not found in plugin.json file");
    let default_snooze = config["alarm"]["default_snooze_minutes"]
        .as_u64()
        .expect("alarm.default_snooze_minutes not found in plugin.json file");
    assert!(default_snooze > 0, "alarm.default_snooze_minutes must be positive");
    let ring_timeout = config["alarm"]["ring_timeout_secs"]
        .as_u64()
        .expect("alarm.ring_timeout_secs not found in plugin.json file");
    let image_size = config["render"]["image_size"]
        .as_u64()
        .expect("render.image_size not found in plugin.json file");
    let oversample = config["render"]["text_oversample"]
        .as_f64()
        .expect("render.text_oversample not found in plugin.json file");
    let alarm_check_ms = config["timing"]["alarm_check_ms"]
        .as_u64()
        .expect("timing.alarm_check_ms not found in plugin.json file");
    let animation_ms = config["timing"]["animation_ms"]
        .as_u64()
        .expect("timing.animation_ms not found in plugin.json file");

    // the player command is picked for the platform we are building for, not the one we build on
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let player_key = match target_os.as_str() {
        "macos" | "windows" => target_os.as_str(),
        _ => "linux",
    };
    let player: Vec<&str> = config["player"][player_key]
        .as_array()
        .expect("player command for the target os not found in plugin.json file")
        .iter()
        .map(|part| part.as_str().expect("player command parts must be strings"))
        .collect();
    assert!(!player.is_empty(), "player command must not be empty");

    writeln!(f, "/// Sound file used when neither the settings nor the shared defaults name one")?;
    writeln!(f, "pub const DEFAULT_SOUND_FILE: &str = {default_sound:?};")?;
    writeln!(f, "/// Snooze increment in minutes when the settings carry none")?;
    writeln!(f, "pub const DEFAULT_SNOOZE_MINUTES: u32 = {default_snooze};")?;
    writeln!(f, "/// Seconds an undismissed alarm keeps ringing")?;
    writeln!(f, "pub const RING_TIMEOUT_SECS: u64 = {ring_timeout};")?;
    writeln!(f, "/// Edge length of the square key image in pixels")?;
    writeln!(f, "pub const IMAGE_SIZE: u32 = {image_size};")?;
    writeln!(f, "/// Oversampling factor for the time text")?;
    writeln!(f, "pub const TEXT_OVERSAMPLE: f32 = {oversample:?};")?;
    writeln!(f, "/// Period of the alarm check ticker")?;
    writeln!(f, "pub const ALARM_CHECK_MS: u64 = {alarm_check_ms};")?;
    writeln!(f, "/// Period of the animation ticker")?;
    writeln!(f, "pub const ANIMATION_MS: u64 = {animation_ms};")?;
    writeln!(f, "/// Sound player command line, `{{file}}` is replaced by the sound file path")?;
    writeln!(f, "pub const PLAYER_COMMAND: &[&str] = &{player:?};")?;
    Ok(())
}
