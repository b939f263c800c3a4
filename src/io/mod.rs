//! Device status sources.
//!
//! The controller exposes one status byte per poll. The fieldbus binding that
//! produces it lives outside this crate; here we only define the seam and two
//! sources that do not need the fieldbus.

pub mod file;
pub mod scripted;

pub use file::FileSource;
pub use scripted::ScriptedSource;

/// Something that can be polled for the raw device status byte.
pub trait IoSource {
    fn read_status(&mut self) -> Result<u8, IoSourceError>;
}

impl<S: IoSource + ?Sized> IoSource for Box<S> {
    fn read_status(&mut self) -> Result<u8, IoSourceError> {
        (**self).read_status()
    }
}

/// Errors raised by a status source.
#[derive(Debug)]
pub enum IoSourceError {
    /// The underlying device or file could not be read
    Read(std::io::Error),
    /// The source had no data to return
    Empty,
    /// A scripted source ran past its last byte
    Exhausted,
}

impl std::fmt::Display for IoSourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoSourceError::Read(e) => write!(f, "Status read failed: {e}"),
            IoSourceError::Empty => write!(f, "Status source returned no data"),
            IoSourceError::Exhausted => write!(f, "Status script exhausted"),
        }
    }
}

impl std::error::Error for IoSourceError {}
