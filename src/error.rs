//! # Error
//! The crate-wide error type. Only an unknown instance is a caller bug; everything else is
//! an external failure that the callers log and carry on from.

use derive_more::derive::{Display, Error, From};

/// A specialized `Result` where the error is this crate's `Error` type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Define a unified error type for this crate.
#[allow(missing_docs, reason = "The variants are self-explanatory.")]
#[derive(Debug, Display, Error, From)]
pub enum Error {
    #[display("no instance with context {_0}")]
    #[from(ignore)]
    UnknownInstance(#[error(not(source))] String),

    #[display("sound player could not be started: {_0}")]
    #[from(ignore)]
    SoundSpawn(std::io::Error),

    #[display("sound player could not be stopped: {_0}")]
    #[from(ignore)]
    SoundKill(std::io::Error),

    #[display("sound player command line is empty")]
    #[from(ignore)]
    EmptyPlayerCommand,

    #[display("host bridge i/o failed: {_0}")]
    HostIo(std::io::Error),

    #[display("image encoding failed: {_0}")]
    Image(image::ImageError),

    #[display("json error: {_0}")]
    Json(serde_json::Error),

    // `SpawnError` does not implement `core::error::Error`
    #[display("{_0:?}")]
    TaskSpawn(#[error(not(source))] embassy_executor::SpawnError),
}
