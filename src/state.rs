//! # State of an alarm instance
//! This module describes the settings blob every key carries and the alarm state derived from it.
//!
//! The host persists the settings as JSON and hands us a full snapshot with every event. The
//! property inspector writes numbers from dropdowns as strings, so the numeric fields accept both
//! forms, and fields we do not know are kept so a round trip never loses anything.
use crate::config::{DEFAULT_SNOOZE_MINUTES, DEFAULT_SOUND_FILE};
use core::fmt::Display;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::warn;

/// The settings for the alarm of one key
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmSettings {
    /// Alarm hour, 0-23
    #[serde(
        default,
        deserialize_with = "lenient_number",
        serialize_with = "number_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub hour: Option<u8>,
    /// Alarm minute, 0-59
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub minute: Option<u8>,
    /// Minutes added to the alarm time by a press while the alarm is armed
    #[serde(
        rename = "increment",
        default,
        deserialize_with = "lenient_number",
        serialize_with = "number_as_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub snooze_increment: Option<u32>,
    /// The audio file to play
    #[serde(rename = "alarm", default, skip_serializing_if = "Option::is_none")]
    pub sound_file: Option<String>,
    /// The alarm is armed
    #[serde(rename = "alarmOn", default, deserialize_with = "lenient_bool")]
    pub enabled: bool,
    /// Next moment the alarm sounds, epoch milliseconds. Only meaningful while `enabled`.
    #[serde(
        rename = "alarmTriggerTime",
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub trigger_timestamp: Option<i64>,
    /// The shared defaults have been merged into this instance
    #[serde(rename = "defaultsSet", default, deserialize_with = "lenient_bool")]
    pub defaults_applied: bool,
    /// Show the alarm time in 24-hour form
    #[serde(default, deserialize_with = "lenient_bool")]
    pub military_time: bool,
    /// Everything else the host keeps in the blob
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AlarmSettings {
    /// Parse a settings snapshot, falling back to empty settings when the blob is not an object.
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value::<Self>(value) {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                warn!("Settings could not be parsed, starting from empty settings: {}", e);
                Self::default()
            }
        }
    }

    /// Drop values outside their range so the effective defaults apply instead.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        if self.hour.is_some_and(|hour| hour > 23) {
            warn!("Discarding out of range alarm hour {:?}", self.hour);
            self.hour = None;
        }
        if self.minute.is_some_and(|minute| minute > 59) {
            warn!("Discarding out of range alarm minute {:?}", self.minute);
            self.minute = None;
        }
        if self.snooze_increment == Some(0) {
            warn!("Discarding zero snooze increment");
            self.snooze_increment = None;
        }
        if self.sound_file.as_deref().is_some_and(|file| file.trim().is_empty()) {
            self.sound_file = None;
        }
        self
    }

    /// Get the alarm hour, 0 when unset
    pub fn hour(&self) -> u8 {
        self.hour.unwrap_or(0)
    }

    /// Get the alarm minute, 0 when unset
    pub fn minute(&self) -> u8 {
        self.minute.unwrap_or(0)
    }

    /// Get the snooze increment in minutes
    pub fn snooze_minutes(&self) -> u32 {
        self.snooze_increment.unwrap_or(DEFAULT_SNOOZE_MINUTES)
    }

    /// Get the sound file, the built-in alarm when unset
    pub fn sound_file(&self) -> &str {
        self.sound_file.as_deref().unwrap_or(DEFAULT_SOUND_FILE)
    }

    /// The trigger timestamp, if the alarm is armed
    pub fn armed_trigger(&self) -> Option<i64> {
        self.trigger_timestamp.filter(|_| self.enabled)
    }
}

/// The state of the alarm as shown on the key
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum AlarmStatus {
    /// The alarm is not armed
    Unset,
    /// The alarm is armed and waiting for its trigger time
    Armed,
    /// The sound is playing
    Ringing,
}

impl AlarmStatus {
    /// Derive the status from the settings and the playback state
    pub const fn of(settings: &AlarmSettings, ringing: bool) -> Self {
        if ringing {
            Self::Ringing
        } else if settings.enabled {
            Self::Armed
        } else {
            Self::Unset
        }
    }
}

/// What the host may hand us where a number belongs
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    /// A JSON integer
    Int(i64),
    /// A JSON float, JavaScript numbers end up here
    Float(f64),
    /// A dropdown value
    Text(String),
    /// Anything else, treated as unset
    Other(Value),
}

/// Accept integers, floats and numeric strings; anything unusable or out of range becomes `None`.
#[allow(clippy::cast_possible_truncation)]
fn lenient_number<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let raw = Option::<LenientNumber>::deserialize(deserializer)?;
    let number = raw.and_then(|raw| match raw {
        LenientNumber::Int(int) => Some(int),
        LenientNumber::Float(float) if float.is_finite() => Some(float.trunc() as i64),
        LenientNumber::Text(text) => text.trim().parse::<i64>().ok(),
        LenientNumber::Float(_) | LenientNumber::Other(_) => None,
    });
    Ok(number.and_then(|number| T::try_from(number).ok()))
}

/// Accept booleans; `null` and anything else is `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(raw, Some(Value::Bool(true))))
}

/// Write numbers the way the property inspector dropdowns store them.
fn number_as_text<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: Display,
{
    match value {
        Some(value) => serializer.collect_str(value),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_dropdown_strings_and_numbers() {
        let settings = AlarmSettings::from_value(json!({
            "hour": "7",
            "minute": 30,
            "increment": "10",
            "alarm": "/tmp/wake.mp3",
            "alarmOn": true,
            "alarmTriggerTime": 1_760_000_000_000_i64,
        }));
        assert_eq!(settings.hour, Some(7));
        assert_eq!(settings.minute, Some(30));
        assert_eq!(settings.snooze_increment, Some(10));
        assert_eq!(settings.sound_file(), "/tmp/wake.mp3");
        assert!(settings.enabled);
        assert_eq!(settings.armed_trigger(), Some(1_760_000_000_000));
    }

    #[test]
    fn repairs_unusable_values() {
        let settings = AlarmSettings::from_value(json!({
            "hour": "24",
            "minute": "abc",
            "increment": "0",
            "alarm": "  ",
            "alarmOn": null,
        }));
        assert_eq!(settings.hour, None);
        assert_eq!(settings.minute, None);
        assert_eq!(settings.snooze_increment, None);
        assert_eq!(settings.sound_file, None);
        assert!(!settings.enabled);
        assert_eq!(settings.hour(), 0);
        assert_eq!(settings.minute(), 0);
        assert_eq!(settings.snooze_minutes(), DEFAULT_SNOOZE_MINUTES);
        assert_eq!(settings.sound_file(), DEFAULT_SOUND_FILE);
    }

    #[test]
    fn not_an_object_gives_empty_settings() {
        assert_eq!(AlarmSettings::from_value(json!("garbage")), AlarmSettings::default());
    }

    #[test]
    fn round_trip_keeps_every_field() {
        let mut settings = AlarmSettings {
            hour: Some(18),
            minute: Some(5),
            snooze_increment: Some(15),
            sound_file: Some("alarms/bell.wav".into()),
            enabled: true,
            trigger_timestamp: Some(1_760_630_700_000),
            defaults_applied: true,
            military_time: true,
            extra: Map::new(),
        };
        settings.extra.insert("volume".into(), json!(80));

        let written = serde_json::to_value(&settings).unwrap();
        assert_eq!(written["hour"], json!("18"));
        assert_eq!(written["increment"], json!("15"));
        assert_eq!(written["volume"], json!(80));

        assert_eq!(AlarmSettings::from_value(written), settings);
    }

    #[test]
    fn trigger_is_ignored_while_disabled() {
        let settings = AlarmSettings {
            enabled: false,
            trigger_timestamp: Some(42),
            ..AlarmSettings::default()
        };
        assert_eq!(settings.armed_trigger(), None);
        assert_eq!(AlarmStatus::of(&settings, false), AlarmStatus::Unset);
        assert_eq!(AlarmStatus::of(&settings, true), AlarmStatus::Ringing);
    }
}
