//! Status source backed by a file.
//!
//! Each poll reads the first byte of the file, which suits device nodes and
//! sysfs-style attributes exported by the fieldbus runtime.

use crate::io::{IoSource, IoSourceError};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;

pub struct FileSource {
    path: PathBuf,
    file: Option<File>,
}

impl FileSource {
    /// Create a source for `path`. The file is opened on first read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: None,
        }
    }

    fn read_first_byte(file: &mut File) -> std::io::Result<Option<u8>> {
        file.seek(SeekFrom::Start(0))?;
        let mut buf = [0u8; 1];
        match file.read(&mut buf)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }
}

impl IoSource for FileSource {
    fn read_status(&mut self) -> Result<u8, IoSourceError> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => File::open(&self.path).map_err(IoSourceError::Read)?,
        };

        match Self::read_first_byte(&mut file) {
            Ok(Some(byte)) => {
                self.file = Some(file);
                Ok(byte)
            }
            Ok(None) => {
                self.file = Some(file);
                Err(IoSourceError::Empty)
            }
            // The handle is dropped so the next poll reopens the path.
            Err(e) => Err(IoSourceError::Read(e)),
        }
    }
}
