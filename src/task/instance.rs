//! # Alarm instance
//! The state of one key: its settings, the sound it may be playing and its animation.
//!
//! A key press does one of three things depending on the state: dismiss a ringing alarm, snooze an
//! armed one, or arm one that is off. The alarm ticker asks every instance whether its alarm is due;
//! a trigger is attempted once, and a sound that nobody dismisses is stopped after the ring timeout.
use crate::config::{DEFAULT_SOUND_FILE, RING_TIMEOUT_SECS};
use crate::state::{AlarmSettings, AlarmStatus};
use crate::task::alarm_trigger::{arm, dismiss, is_due, snooze};
use crate::task::animation::RenderState;
use crate::task::sound::SoundBackend;
use chrono::{DateTime, TimeZone};
use tracing::{info, warn};

/// How long an alarm may ring before it dismisses itself; `None` if it rings until pressed
#[allow(clippy::cast_possible_wrap)]
pub const RING_TIMEOUT_MS: Option<i64> = if RING_TIMEOUT_SECS == 0 {
    None
} else {
    Some(RING_TIMEOUT_SECS as i64 * 1000)
};

/// One alarm key
pub struct AlarmInstance<P: SoundBackend> {
    /// The host's id of the key
    context: String,
    /// The settings as last seen or changed
    settings: AlarmSettings,
    /// The ringing animation
    render_state: RenderState,
    /// The playing sound
    player: Option<P::Handle>,
    /// When the sound started, epoch milliseconds
    ringing_since: Option<i64>,
    /// The last trigger we tried to ring for
    last_fired: Option<i64>,
    /// The key is on screen
    visible: bool,
}

impl<P: SoundBackend> AlarmInstance<P> {
    /// Create a visible, silent instance
    pub fn new(context: impl Into<String>, settings: AlarmSettings) -> Self {
        Self {
            context: context.into(),
            settings,
            render_state: RenderState::new(),
            player: None,
            ringing_since: None,
            last_fired: None,
            visible: true,
        }
    }

    /// Get the context
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Get the settings
    pub const fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    /// Replace the settings with a newer snapshot
    pub fn replace_settings(&mut self, settings: AlarmSettings) {
        self.settings = settings;
    }

    /// Get the animation state
    pub const fn render_state(&self) -> &RenderState {
        &self.render_state
    }

    /// Check if the alarm sound is playing
    pub const fn is_playing(&self) -> bool {
        self.player.is_some()
    }

    /// The state shown on the key
    pub const fn status(&self) -> AlarmStatus {
        AlarmStatus::of(&self.settings, self.is_playing())
    }

    /// Check if the key is on screen
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set whether the key is on screen
    pub const fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Handle a key press with the settings the host sent along
    pub fn key_pressed<Tz: TimeZone>(
        &mut self,
        settings: AlarmSettings,
        now: &DateTime<Tz>,
        backend: &mut P,
    ) {
        self.settings = settings;
        if self.is_playing() {
            info!("Key {} pressed while ringing", self.context);
            dismiss(&mut self.settings);
            self.stop_playing(backend);
            return;
        }
        if self.settings.sound_file.is_none() {
            self.settings.sound_file = Some(DEFAULT_SOUND_FILE.into());
        }
        if self.settings.enabled {
            info!("Key {} pressed while armed, snoozing", self.context);
            snooze(&mut self.settings, now);
        } else {
            info!("Key {} pressed while off, arming", self.context);
            arm(&mut self.settings, now);
        }
    }

    /// Start the sound if the alarm is due. Returns true if it started.
    pub fn check_trigger(&mut self, now_ms: i64, backend: &mut P) -> bool {
        let Some(trigger) = self.settings.armed_trigger() else {
            return false;
        };
        if self.is_playing() || !is_due(trigger, now_ms) || self.last_fired == Some(trigger) {
            return false;
        }
        self.last_fired = Some(trigger);
        info!("Alarm {} is due", self.context);
        match backend.spawn(self.settings.sound_file()) {
            Ok(handle) => {
                self.player = Some(handle);
                self.ringing_since = Some(now_ms);
                self.render_state.start_ringing();
                true
            }
            Err(e) => {
                warn!("Alarm {} could not start its sound: {}", self.context, e);
                false
            }
        }
    }

    /// Dismiss an alarm that has rung for too long. Returns true if it was dismissed.
    pub fn check_ring_timeout(&mut self, now_ms: i64, backend: &mut P) -> bool {
        let (Some(since), Some(timeout)) = (self.ringing_since, RING_TIMEOUT_MS) else {
            return false;
        };
        if now_ms - since < timeout {
            return false;
        }
        info!("Alarm {} was not dismissed, stopping it", self.context);
        dismiss(&mut self.settings);
        self.stop_playing(backend);
        true
    }

    /// Stop the sound if one is playing and go back to the calm look
    pub fn stop_playing(&mut self, backend: &mut P) {
        if let Some(handle) = self.player.take() {
            info!("Stopping the sound of {}", self.context);
            if let Err(e) = backend.kill(handle) {
                warn!("Sound of {} could not be stopped: {}", self.context, e);
            }
        }
        self.ringing_since = None;
        self.render_state.stop_ringing();
    }

    /// Advance the animation. Returns true if the key needs a new image.
    pub const fn tick(&mut self) -> bool {
        self.render_state.tick()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::task::alarm_trigger::DAY_MS;
    use chrono::Utc;

    /// Counts what it is asked to do
    #[derive(Default)]
    struct CountingBackend {
        spawned: u32,
        killed: u32,
        fail: bool,
    }

    impl SoundBackend for CountingBackend {
        type Handle = u32;

        fn spawn(&mut self, _sound_file: &str) -> Result<u32> {
            if self.fail {
                return Err(Error::EmptyPlayerCommand);
            }
            self.spawned += 1;
            Ok(self.spawned)
        }

        fn kill(&mut self, _handle: u32) -> Result<()> {
            self.killed += 1;
            Ok(())
        }
    }

    fn armed(trigger: i64) -> AlarmInstance<CountingBackend> {
        AlarmInstance::new(
            "key",
            AlarmSettings {
                hour: Some(7),
                minute: Some(0),
                enabled: true,
                trigger_timestamp: Some(trigger),
                ..AlarmSettings::default()
            },
        )
    }

    #[test]
    fn rings_once_per_trigger() {
        let mut backend = CountingBackend::default();
        let mut instance = armed(1_000);
        assert!(!instance.check_trigger(999, &mut backend));
        assert!(instance.check_trigger(1_000, &mut backend));
        assert!(!instance.check_trigger(2_000, &mut backend));
        assert_eq!(backend.spawned, 1);
        assert_eq!(instance.status(), AlarmStatus::Ringing);
    }

    #[test]
    fn new_trigger_while_ringing_is_ignored() {
        let mut backend = CountingBackend::default();
        let mut instance = armed(1_000);
        assert!(instance.check_trigger(1_000, &mut backend));

        let mut moved = instance.settings().clone();
        moved.trigger_timestamp = Some(2_000);
        instance.replace_settings(moved);
        assert!(!instance.check_trigger(2_000, &mut backend));
        assert_eq!(backend.spawned, 1);
        assert!(instance.is_playing());
    }

    #[test]
    fn failed_spawn_is_not_retried() {
        let mut backend = CountingBackend {
            fail: true,
            ..CountingBackend::default()
        };
        let mut instance = armed(1_000);
        assert!(!instance.check_trigger(1_000, &mut backend));
        backend.fail = false;
        assert!(!instance.check_trigger(2_000, &mut backend));
        assert_eq!(backend.spawned, 0);
        assert!(!instance.is_playing());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut backend = CountingBackend::default();
        let mut instance = armed(1_000);
        instance.stop_playing(&mut backend);
        assert!(instance.check_trigger(1_000, &mut backend));
        instance.stop_playing(&mut backend);
        instance.stop_playing(&mut backend);
        assert_eq!(backend.killed, 1);
        assert!(!instance.is_playing());
        assert_eq!(*instance.render_state(), RenderState::new());
    }

    #[test]
    fn press_while_ringing_dismisses() {
        let mut backend = CountingBackend::default();
        let mut instance = armed(1_000);
        assert!(instance.check_trigger(1_000, &mut backend));
        let settings = instance.settings().clone();
        instance.key_pressed(settings, &Utc::now(), &mut backend);
        assert!(!instance.is_playing());
        assert!(!instance.settings().enabled);
        assert_eq!(instance.settings().trigger_timestamp, Some(1_000 + DAY_MS));
        assert_eq!(backend.killed, 1);
    }

    #[test]
    fn press_while_off_arms_with_the_default_sound() {
        let mut backend = CountingBackend::default();
        let mut instance = AlarmInstance::<CountingBackend>::new("key", AlarmSettings::default());
        instance.key_pressed(AlarmSettings::default(), &Utc::now(), &mut backend);
        assert!(instance.settings().enabled);
        assert_eq!(instance.settings().sound_file.as_deref(), Some(DEFAULT_SOUND_FILE));
        assert!(instance.settings().armed_trigger().is_some());
        assert_eq!(backend.spawned, 0);
    }

    #[test]
    fn undismissed_alarm_times_out() {
        let Some(timeout) = RING_TIMEOUT_MS else {
            return;
        };
        let mut backend = CountingBackend::default();
        let mut instance = armed(1_000);
        assert!(instance.check_trigger(1_000, &mut backend));
        assert!(!instance.check_ring_timeout(1_000 + timeout - 1, &mut backend));
        assert!(instance.check_ring_timeout(1_000 + timeout, &mut backend));
        assert!(!instance.is_playing());
        assert!(!instance.settings().enabled);
        assert!(!instance.check_ring_timeout(1_000 + 2 * timeout, &mut backend));
    }
}
