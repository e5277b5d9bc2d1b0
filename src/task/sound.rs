//! # Sound
//! This module plays the alarm sound through the command line player of the platform.
//!
//! Each ringing alarm owns one child process. Stopping the sound ends that process, directly on unix
//! and through `taskkill` elsewhere. The exit codes and output of the player are ignored.
use crate::config::PLAYER_COMMAND;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use tracing::{debug, info};

/// Starts and stops sound playback
pub trait SoundBackend {
    /// What we need to keep around to stop the playback again
    type Handle;

    /// Start playing the sound file
    fn spawn(&mut self, sound_file: &str) -> Result<Self::Handle>;

    /// Stop the playback started with `handle`
    fn kill(&mut self, handle: Self::Handle) -> Result<()>;
}

/// Plays sounds by running the platform's sound player as a child process
pub struct ProcessPlayer {
    /// Program and arguments, `{file}` marks where the sound file goes
    command: Vec<String>,
    /// The player runs here, relative sound files resolve against it
    working_dir: PathBuf,
}

impl ProcessPlayer {
    /// Create a player using the command line configured for this platform
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self::with_command(
            PLAYER_COMMAND.iter().map(ToString::to_string).collect(),
            working_dir,
        )
    }

    /// Create a player with a custom command line
    pub fn with_command(command: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            working_dir: working_dir.into(),
        }
    }

    /// Build the command for one sound file
    fn command_for(&self, sound_file: &str) -> Result<Command> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or(Error::EmptyPlayerCommand)?;
        let mut command = Command::new(program);
        command
            .args(args.iter().map(|arg| arg.replace("{file}", sound_file)))
            .current_dir(&self.working_dir)
            // stdout belongs to the host bridge
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        Ok(command)
    }
}

impl SoundBackend for ProcessPlayer {
    type Handle = Child;

    fn spawn(&mut self, sound_file: &str) -> Result<Child> {
        let child = self
            .command_for(sound_file)?
            .spawn()
            .map_err(Error::SoundSpawn)?;
        info!("Sound player started for {} with pid {}", sound_file, child.id());
        Ok(child)
    }

    fn kill(&mut self, child: Child) -> Result<()> {
        debug!("Stopping sound player with pid {}", child.id());
        terminate(child)
    }
}

/// Kill the player and reap it
#[cfg(unix)]
fn terminate(mut child: Child) -> Result<()> {
    child.kill().map_err(Error::SoundKill)?;
    child.wait().map_err(Error::SoundKill)?;
    Ok(())
}

/// Kill the player together with whatever it started
#[cfg(not(unix))]
fn terminate(child: Child) -> Result<()> {
    Command::new("taskkill")
        .args(["/PID", &child.id().to_string(), "/F"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(Error::SoundKill)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_command_is_not_empty() {
        assert!(!PLAYER_COMMAND.is_empty());
        assert!(PLAYER_COMMAND.iter().any(|part| part.contains("{file}")));
    }

    #[test]
    fn empty_command_is_an_error() {
        let mut player = ProcessPlayer::with_command(Vec::new(), ".");
        assert!(matches!(
            player.spawn("bell.wav"),
            Err(Error::EmptyPlayerCommand)
        ));
    }

    #[test]
    fn missing_player_is_a_spawn_error() {
        let mut player =
            ProcessPlayer::with_command(vec!["no-such-player-here".into(), "{file}".into()], ".");
        assert!(matches!(player.spawn("bell.wav"), Err(Error::SoundSpawn(_))));
    }

    #[cfg(unix)]
    #[test]
    fn running_player_can_be_stopped() {
        let mut player = ProcessPlayer::with_command(vec!["sleep".into(), "{file}".into()], ".");
        let child = player.spawn("30").unwrap();
        assert!(player.kill(child).is_ok());
    }
}
