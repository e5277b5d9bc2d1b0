//! # Alarm Settings
//! This module seeds new keys from the shared defaults and writes settings back to the host.
//!
//! The host owns the settings of every key. Whatever we change is written back through the host
//! bridge, and the last settings of any key are mirrored to the shared defaults, so the next key
//! that appears starts from them.
use crate::config::DEFAULT_SOUND_FILE;
use crate::state::AlarmSettings;
use crate::task::host_bridge::Host;
use tracing::{debug, info, warn};

/// The hour a new key starts with: one after the shared one, wrapping past midnight to 1 o'clock
pub const fn next_default_hour(hour: u8) -> u8 {
    let next = hour.saturating_add(1);
    if next >= 24 { 1 } else { next }
}

/// Merge the shared defaults into the settings of a key that has not been seeded yet.
/// Returns false if the key was already seeded and nothing changed.
pub fn apply_shared_defaults(settings: &mut AlarmSettings, shared: Option<&AlarmSettings>) -> bool {
    if settings.defaults_applied {
        return false;
    }
    if let Some(shared) = shared {
        if let Some(hour) = shared.hour {
            settings.hour = Some(next_default_hour(hour));
        }
        if shared.snooze_increment.is_some() {
            settings.snooze_increment = shared.snooze_increment;
        }
        if let Some(sound_file) = &shared.sound_file {
            settings.sound_file = Some(sound_file.clone());
        }
        settings.military_time = shared.military_time;
    }
    if settings.sound_file.is_none() {
        settings.sound_file = Some(DEFAULT_SOUND_FILE.into());
    }
    settings.defaults_applied = true;
    info!(
        "Seeded new alarm with {:?}:{:?}, snooze {} min",
        settings.hour,
        settings.minute,
        settings.snooze_minutes()
    );
    true
}

/// Write the settings of a key back to the host
pub fn persist<H: Host>(host: &mut H, context: &str, settings: &AlarmSettings) {
    debug!("Persisting settings of {}", context);
    if let Err(e) = host.set_settings(context, settings) {
        warn!("Settings of {} could not be persisted: {}", context, e);
    }
}

/// Mirror settings to the shared defaults
pub fn share<H: Host>(host: &mut H, settings: &AlarmSettings) {
    if let Err(e) = host.set_shared_defaults(settings) {
        warn!("Shared defaults could not be written: {}", e);
    }
}
