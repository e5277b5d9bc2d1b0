//! Events and system channel for sending and receiving events

use crate::state::AlarmSettings;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, TrySendError};
use std::thread;
use std::time::Duration;

/// System event channel for sending and receiving events
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, HostEvent, EVENT_CHANNEL_CAPACITY> =
    Channel::new();

/// The capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 10;

/// How long a plain thread sleeps before it retries a full channel
const FULL_CHANNEL_BACKOFF: Duration = Duration::from_millis(5);

/// Sends an event from a thread outside the executor, sleeping while the channel is full
pub fn send_event_blocking(mut event: HostEvent) {
    loop {
        match EVENT_CHANNEL.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(rejected)) => {
                event = rejected;
                thread::sleep(FULL_CHANNEL_BACKOFF);
            }
        }
    }
}

/// Receives the next event from the system channel
pub async fn receive_event() -> HostEvent {
    EVENT_CHANNEL.receiver().receive().await
}

/// The events the host sends us. Key events carry the context (the host's id of the key) and the
/// full settings snapshot the host holds for it.
#[derive(PartialEq, Debug, Clone)]
pub enum HostEvent {
    /// A key showing the alarm became visible, either for the first time or again
    Appear {
        /// The key
        context: String,
        /// Its settings
        settings: AlarmSettings,
    },
    /// The settings of a key were edited
    SettingsChanged {
        /// The key
        context: String,
        /// The new settings
        settings: AlarmSettings,
    },
    /// A key was pressed
    KeyPressed {
        /// The key
        context: String,
        /// Its settings at the time of the press
        settings: AlarmSettings,
    },
    /// A key is no longer visible; its alarm keeps running
    Disappear {
        /// The key
        context: String,
    },
    /// The shared defaults, the data is the settings last mirrored for new keys
    SharedDefaults(AlarmSettings),
    /// The host closed the bridge
    Shutdown,
}
