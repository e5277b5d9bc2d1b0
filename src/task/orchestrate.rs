//! # Orchestrate Tasks
//! Tasks that drive the plugin, and the plugin itself: the registry of alarm keys and the dispatcher
//! that applies host events to them.
//!
//! The orchestrator receives the host events from the event channel, the alarm ticker checks every
//! second whether an alarm is due, and the animation ticker advances the ringing animation. They all
//! work on the one [`Plugin`] in [`PLUGIN`], so there is never more than one of them touching a key.
use crate::config::{ALARM_CHECK_MS, ANIMATION_MS};
use crate::error::{Error, Result};
use crate::event::{HostEvent, receive_event};
use crate::state::AlarmSettings;
use crate::task::{
    alarm_settings::{apply_shared_defaults, persist, share},
    display::KeyRenderer,
    host_bridge::{Host, StdioHost},
    instance::AlarmInstance,
    sound::{ProcessPlayer, SoundBackend},
};
use chrono::{DateTime, Local, TimeZone};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex, signal::Signal};
use embassy_time::{Duration, Ticker};
use std::collections::BTreeMap;
use std::io::Stdout;
use tracing::{debug, error, info, warn};

/// The plugin as it runs against the real host and sound player
pub type LivePlugin = Plugin<StdioHost<Stdout>, ProcessPlayer>;

/// The plugin shared by the tasks
pub static PLUGIN: Mutex<CriticalSectionRawMutex, Option<LivePlugin>> = Mutex::new(None);

/// Signalled once the plugin has shut down
pub static SHUTDOWN_SIGNAL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// All alarm keys and what they share
pub struct Plugin<H: Host, P: SoundBackend> {
    /// Where images and settings go
    host: H,
    /// Plays the alarm sounds
    backend: P,
    /// Draws the key images
    renderer: KeyRenderer,
    /// The alarm keys by context
    instances: BTreeMap<String, AlarmInstance<P>>,
    /// The settings new keys start from
    shared_defaults: Option<AlarmSettings>,
    /// The host has answered with its shared defaults; new keys wait for this before seeding
    shared_defaults_loaded: bool,
}

impl<H: Host, P: SoundBackend> Plugin<H, P> {
    /// Create a plugin without any keys
    pub fn new(host: H, backend: P) -> Self {
        Self::with_renderer(host, backend, KeyRenderer::new())
    }

    /// Create a plugin drawing with the given renderer
    pub const fn with_renderer(host: H, backend: P, renderer: KeyRenderer) -> Self {
        Self {
            host,
            backend,
            renderer,
            instances: BTreeMap::new(),
            shared_defaults: None,
            shared_defaults_loaded: false,
        }
    }

    /// Get the host
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Get the sound backend
    pub const fn backend(&self) -> &P {
        &self.backend
    }

    /// Get a key by context
    pub fn instance(&self, context: &str) -> Option<&AlarmInstance<P>> {
        self.instances.get(context)
    }

    /// Get the number of keys
    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    /// Get the shared defaults as last received or written
    pub const fn shared_defaults(&self) -> Option<&AlarmSettings> {
        self.shared_defaults.as_ref()
    }

    /// Apply one host event. `now` is the local time the event is handled at.
    pub fn handle_event<Tz: TimeZone>(&mut self, event: HostEvent, now: &DateTime<Tz>) -> Result<()> {
        match event {
            HostEvent::Appear { context, settings } => {
                self.handle_appear(context, settings);
                Ok(())
            }
            HostEvent::SettingsChanged { context, settings } => {
                self.handle_settings_changed(&context, settings)
            }
            HostEvent::KeyPressed { context, settings } => {
                self.handle_key_pressed(&context, settings, now)
            }
            HostEvent::Disappear { context } => {
                info!("Key {} disappeared", context);
                self.instance_mut(&context)?.set_visible(false);
                Ok(())
            }
            HostEvent::SharedDefaults(settings) => {
                self.handle_shared_defaults(settings);
                Ok(())
            }
            HostEvent::Shutdown => {
                self.shutdown();
                Ok(())
            }
        }
    }

    /// Check every key for a due alarm or one that rang for too long
    pub fn check_alarms(&mut self, now_ms: i64) {
        for instance in self.instances.values_mut() {
            if instance.check_ring_timeout(now_ms, &mut self.backend) {
                persist(&mut self.host, instance.context(), instance.settings());
                push_image(&self.renderer, &mut self.host, instance);
            } else if instance.check_trigger(now_ms, &mut self.backend) {
                push_image(&self.renderer, &mut self.host, instance);
            }
        }
    }

    /// Advance the animation of every ringing key
    pub fn tick_animations(&mut self) {
        for instance in self.instances.values_mut() {
            if instance.tick() {
                push_image(&self.renderer, &mut self.host, instance);
            }
        }
    }

    /// Stop every sound and forget all keys
    pub fn shutdown(&mut self) {
        info!("Shutting down {} alarm keys", self.instances.len());
        for instance in self.instances.values_mut() {
            instance.stop_playing(&mut self.backend);
        }
        self.instances.clear();
    }

    /// A key appeared: register it, seed it from the shared defaults if it is new, show it
    fn handle_appear(&mut self, context: String, settings: AlarmSettings) {
        info!("Key {} appeared", context);
        let instance = self
            .instances
            .entry(context)
            .or_insert_with_key(|context| AlarmInstance::new(context.clone(), AlarmSettings::default()));
        instance.replace_settings(settings);
        instance.set_visible(true);

        if self.shared_defaults_loaded {
            seed(&mut self.host, &mut self.shared_defaults, instance);
        } else if !instance.settings().defaults_applied {
            debug!("Key {} waits for the shared defaults", instance.context());
        }
        push_image(&self.renderer, &mut self.host, instance);
    }

    /// The host sent its shared defaults: keep them and seed the keys that were waiting for them
    fn handle_shared_defaults(&mut self, settings: AlarmSettings) {
        info!("Shared defaults received");
        self.shared_defaults = Some(settings);
        self.shared_defaults_loaded = true;
        for instance in self.instances.values_mut() {
            if seed(&mut self.host, &mut self.shared_defaults, instance) {
                push_image(&self.renderer, &mut self.host, instance);
            }
        }
    }

    /// The settings of a key were edited: keep them, mirror them to the shared defaults and echo them
    fn handle_settings_changed(&mut self, context: &str, settings: AlarmSettings) -> Result<()> {
        info!("Settings of {} changed", context);
        let instance = self
            .instances
            .get_mut(context)
            .ok_or_else(|| Error::UnknownInstance(context.into()))?;
        instance.replace_settings(settings);
        share(&mut self.host, instance.settings());
        self.shared_defaults = Some(instance.settings().clone());
        persist(&mut self.host, context, instance.settings());
        push_image(&self.renderer, &mut self.host, instance);
        Ok(())
    }

    /// A key was pressed
    fn handle_key_pressed<Tz: TimeZone>(
        &mut self,
        context: &str,
        settings: AlarmSettings,
        now: &DateTime<Tz>,
    ) -> Result<()> {
        let instance = self
            .instances
            .get_mut(context)
            .ok_or_else(|| Error::UnknownInstance(context.into()))?;
        instance.key_pressed(settings, now, &mut self.backend);
        persist(&mut self.host, context, instance.settings());
        push_image(&self.renderer, &mut self.host, instance);
        Ok(())
    }

    /// Get a key by context, an error if we do not know it
    fn instance_mut(&mut self, context: &str) -> Result<&mut AlarmInstance<P>> {
        self.instances
            .get_mut(context)
            .ok_or_else(|| Error::UnknownInstance(context.into()))
    }
}

/// Seed a key that has not been seeded yet from the shared defaults, write it back and make it the
/// new shared defaults. Returns false if the key was already seeded.
fn seed<H: Host, P: SoundBackend>(
    host: &mut H,
    shared_defaults: &mut Option<AlarmSettings>,
    instance: &mut AlarmInstance<P>,
) -> bool {
    let mut seeded = instance.settings().clone();
    if !apply_shared_defaults(&mut seeded, shared_defaults.as_ref()) {
        return false;
    }
    instance.replace_settings(seeded.clone());
    persist(host, instance.context(), &seeded);
    share(host, &seeded);
    *shared_defaults = Some(seeded);
    true
}

/// Render the image of a key and send it to the host, unless the key is hidden
fn push_image<H: Host, P: SoundBackend>(
    renderer: &KeyRenderer,
    host: &mut H,
    instance: &AlarmInstance<P>,
) {
    if !instance.is_visible() {
        return;
    }
    let image = match renderer.render_data_url(instance.settings(), instance.render_state()) {
        Ok(image) => image,
        Err(e) => {
            warn!("Image of {} could not be rendered: {}", instance.context(), e);
            return;
        }
    };
    if let Err(e) = host.set_image(instance.context(), &image) {
        warn!("Image of {} could not be sent: {}", instance.context(), e);
    }
}

/// Put the plugin where the tasks find it
pub async fn install(plugin: LivePlugin) {
    *(PLUGIN.lock().await) = Some(plugin);
}

/// This task applies the host events to the plugin. It acts as the main task of the plugin.
/// After the shutdown event it signals [`SHUTDOWN_SIGNAL`] and ends.
#[embassy_executor::task]
pub async fn orchestrator() {
    info!("Orchestrate task starting");

    loop {
        // receive the events, halting the task until an event is received
        let event = receive_event().await;
        let shutdown = event == HostEvent::Shutdown;

        // Lock the mutex to get a mutable reference to the plugin
        let mut plugin_guard = PLUGIN.lock().await;
        let Some(plugin) = plugin_guard.as_mut() else {
            warn!("Plugin not initialized");
            continue;
        };

        if let Err(e) = plugin.handle_event(event, &Local::now()) {
            error!("Event could not be handled: {}", e);
        }
        drop(plugin_guard);

        if shutdown {
            SHUTDOWN_SIGNAL.signal(());
            break;
        }
    }
}

/// This task checks once per period whether an alarm is due.
#[embassy_executor::task]
pub async fn alarm_ticker() {
    info!("Alarm ticker task started");
    let mut ticker = Ticker::every(Duration::from_millis(ALARM_CHECK_MS));

    loop {
        ticker.next().await;
        let mut plugin_guard = PLUGIN.lock().await;
        if let Some(plugin) = plugin_guard.as_mut() {
            plugin.check_alarms(Local::now().timestamp_millis());
        }
    }
}

/// This task advances the ringing animation.
#[embassy_executor::task]
pub async fn animation_ticker() {
    info!("Animation ticker task started");
    let mut ticker = Ticker::every(Duration::from_millis(ANIMATION_MS));

    loop {
        ticker.next().await;
        let mut plugin_guard = PLUGIN.lock().await;
        if let Some(plugin) = plugin_guard.as_mut() {
            plugin.tick_animations();
        }
    }
}
