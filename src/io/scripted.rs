//! Status source that replays a fixed sequence of bytes.

use crate::io::{IoSource, IoSourceError};
use std::collections::VecDeque;

/// Replays scripted status bytes, one per poll.
///
/// After the script runs out the source either keeps repeating the final
/// byte or reports [`IoSourceError::Exhausted`].
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    script: VecDeque<u8>,
    last: Option<u8>,
    hold_last: bool,
}

impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = u8>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            hold_last: false,
        }
    }

    /// Keep returning the final byte once the script is exhausted.
    pub fn holding_last(mut self) -> Self {
        self.hold_last = true;
        self
    }

    /// Append `byte` repeated `polls` times.
    pub fn then(mut self, byte: u8, polls: usize) -> Self {
        self.script.extend(std::iter::repeat(byte).take(polls));
        self
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl IoSource for ScriptedSource {
    fn read_status(&mut self) -> Result<u8, IoSourceError> {
        match self.script.pop_front() {
            Some(byte) => {
                self.last = Some(byte);
                Ok(byte)
            }
            None => match self.last {
                Some(byte) if self.hold_last => Ok(byte),
                _ => Err(IoSourceError::Exhausted),
            },
        }
    }
}
