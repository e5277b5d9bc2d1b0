//! # Host bridge
//! This module connects the plugin to the host over line delimited JSON.
//!
//! Every line on stdin is one message from the host, every line we write to stdout is one command
//! for the host. Inbound messages are turned into [`HostEvent`]s and queued on the event channel by a
//! plain thread, since reading stdin blocks. The outbound side implements [`Host`].
use crate::error::{Error, Result};
use crate::event::{HostEvent, send_event_blocking};
use crate::state::AlarmSettings;
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{BufRead, Write};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// The commands we send to the host
pub trait Host {
    /// Show an image on a key. The image is a `data:` URL.
    fn set_image(&mut self, context: &str, image: &str) -> Result<()>;

    /// Store the settings of a key
    fn set_settings(&mut self, context: &str, settings: &AlarmSettings) -> Result<()>;

    /// Store the settings new keys start from
    fn set_shared_defaults(&mut self, settings: &AlarmSettings) -> Result<()>;
}

/// Writes host commands as JSON lines
pub struct StdioHost<W: Write> {
    /// Where the lines go
    out: W,
    /// The id the host gave us, it addresses the shared defaults
    plugin_uuid: String,
}

impl<W: Write> StdioHost<W> {
    /// Create a host writing to `out`
    pub fn new(out: W, plugin_uuid: impl Into<String>) -> Self {
        Self {
            out,
            plugin_uuid: plugin_uuid.into(),
        }
    }

    /// Tell the host who we are. This must be the first message.
    pub fn register(&mut self, register_event: &str) -> Result<()> {
        info!("Registering with the host as {}", self.plugin_uuid);
        let message = json!({ "event": register_event, "uuid": self.plugin_uuid });
        self.send(&message)
    }

    /// Ask the host for the shared defaults, they arrive as a `didReceiveGlobalSettings` message
    pub fn request_shared_defaults(&mut self) -> Result<()> {
        let message = json!({ "event": "getGlobalSettings", "context": self.plugin_uuid });
        self.send(&message)
    }

    /// Get the writer back
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Write one message as one line
    fn send(&mut self, message: &Value) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n").map_err(Error::HostIo)?;
        self.out.flush().map_err(Error::HostIo)
    }
}

impl<W: Write> Host for StdioHost<W> {
    fn set_image(&mut self, context: &str, image: &str) -> Result<()> {
        let message = json!({
            "event": "setImage",
            "context": context,
            "payload": { "image": image, "target": 0 },
        });
        self.send(&message)
    }

    fn set_settings(&mut self, context: &str, settings: &AlarmSettings) -> Result<()> {
        let message = json!({
            "event": "setSettings",
            "context": context,
            "payload": serde_json::to_value(settings)?,
        });
        self.send(&message)
    }

    fn set_shared_defaults(&mut self, settings: &AlarmSettings) -> Result<()> {
        let message = json!({
            "event": "setGlobalSettings",
            "context": self.plugin_uuid,
            "payload": serde_json::to_value(settings)?,
        });
        self.send(&message)
    }
}

/// A message from the host, only the parts we look at
#[derive(Deserialize)]
struct InboundMessage {
    /// What happened
    event: String,
    /// The key it happened to
    #[serde(default)]
    context: Option<String>,
    /// Event data
    #[serde(default)]
    payload: InboundPayload,
}

/// Event data of a host message
#[derive(Deserialize, Default)]
struct InboundPayload {
    /// The settings snapshot, if the event carries one
    #[serde(default)]
    settings: Value,
}

/// Turn one line from the host into an event. Messages we have no use for give `None`.
pub fn parse_event(line: &str) -> Result<Option<HostEvent>> {
    let message: InboundMessage = serde_json::from_str(line)?;
    let settings = message.payload.settings;
    let event = match (message.event.as_str(), message.context) {
        ("willAppear", Some(context)) => HostEvent::Appear {
            context,
            settings: AlarmSettings::from_value(settings),
        },
        ("didReceiveSettings", Some(context)) => HostEvent::SettingsChanged {
            context,
            settings: AlarmSettings::from_value(settings),
        },
        ("keyDown", Some(context)) => HostEvent::KeyPressed {
            context,
            settings: AlarmSettings::from_value(settings),
        },
        ("willDisappear", Some(context)) => HostEvent::Disappear { context },
        ("didReceiveGlobalSettings", _) => {
            HostEvent::SharedDefaults(AlarmSettings::from_value(settings))
        }
        (other, _) => {
            debug!("Ignoring host message {}", other);
            return Ok(None);
        }
    };
    Ok(Some(event))
}

/// Read host messages until the input ends and hand every event to `sink`.
/// A line that cannot be parsed is logged and skipped. The end of the input is reported as
/// [`HostEvent::Shutdown`].
pub fn forward_events<R: BufRead>(reader: R, mut sink: impl FnMut(HostEvent)) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Reading from the host failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match parse_event(&line) {
            Ok(Some(event)) => sink(event),
            Ok(None) => {}
            Err(e) => warn!("Ignoring malformed host message: {}", e),
        }
    }
    info!("Host closed the bridge");
    sink(HostEvent::Shutdown);
}

/// Start the thread that reads host messages from stdin and queues them on the event channel
pub fn spawn_stdin_reader() -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("host-bridge".into())
        .spawn(|| {
            let stdin = std::io::stdin();
            forward_events(stdin.lock(), send_event_blocking);
        })
        .map_err(Error::HostIo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn written_lines(host: StdioHost<Vec<u8>>) -> Vec<Value> {
        String::from_utf8(host.into_inner())
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn parses_key_events() {
        let line = r#"{"event":"keyDown","context":"abc","payload":{"settings":{"hour":"6","alarmOn":true}}}"#;
        let Some(HostEvent::KeyPressed { context, settings }) = parse_event(line).unwrap() else {
            panic!("not a key press");
        };
        assert_eq!(context, "abc");
        assert_eq!(settings.hour, Some(6));
        assert!(settings.enabled);
    }

    #[test]
    fn parses_shared_defaults_without_context() {
        let line = r#"{"event":"didReceiveGlobalSettings","payload":{"settings":{"increment":"15"}}}"#;
        let Some(HostEvent::SharedDefaults(settings)) = parse_event(line).unwrap() else {
            panic!("not shared defaults");
        };
        assert_eq!(settings.snooze_increment, Some(15));
    }

    #[test]
    fn ignores_unknown_messages() {
        let line = r#"{"event":"deviceDidConnect","device":"x"}"#;
        assert_eq!(parse_event(line).unwrap(), None);
        assert!(parse_event("not json").is_err());
    }

    #[test]
    fn end_of_input_shuts_down() {
        let input = concat!(
            r#"{"event":"willAppear","context":"a","payload":{"settings":{}}}"#,
            "\n\ngarbage\n",
            r#"{"event":"willDisappear","context":"a"}"#,
            "\n"
        );
        let mut events = Vec::new();
        forward_events(Cursor::new(input), |event| events.push(event));
        assert_eq!(
            events,
            vec![
                HostEvent::Appear {
                    context: "a".into(),
                    settings: AlarmSettings::default(),
                },
                HostEvent::Disappear { context: "a".into() },
                HostEvent::Shutdown,
            ]
        );
    }

    #[test]
    fn writes_one_command_per_line() {
        let mut host = StdioHost::new(Vec::new(), "plugin-1");
        host.register("registerPlugin").unwrap();
        host.set_image("key-1", "data:image/png;base64,AAAA").unwrap();
        let settings = AlarmSettings {
            hour: Some(7),
            ..AlarmSettings::default()
        };
        host.set_settings("key-1", &settings).unwrap();
        host.set_shared_defaults(&settings).unwrap();

        let lines = written_lines(host);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({"event": "registerPlugin", "uuid": "plugin-1"}));
        assert_eq!(lines[1]["payload"]["image"], "data:image/png;base64,AAAA");
        assert_eq!(lines[2]["event"], "setSettings");
        assert_eq!(lines[2]["payload"]["hour"], "7");
        assert_eq!(lines[3]["event"], "setGlobalSettings");
        assert_eq!(lines[3]["context"], "plugin-1");
    }
}
