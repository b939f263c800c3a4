//! Fixed-size binary layouts for the persisted artifacts.
//!
//! Artifacts are serialized with bincode's default options, which write every
//! `u32` as four little-endian bytes in field order. There is no header,
//! version or checksum; a blob whose length does not match its layout is
//! treated as absent.

use crate::core::settings::{Settings, MAX_WINDOW_SZ};
use crate::core::window::{Record, SlidingWindowStats};
use serde::de::{self, DeserializeOwned, SeqAccess, Visitor};
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const SLOTS: usize = MAX_WINDOW_SZ as usize;

/// The three independently stored artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Settings,
    Window,
    LastRecord,
}

impl ArtifactKind {
    pub fn file_name(&self) -> &'static str {
        match self {
            ArtifactKind::Settings => "settings.bin",
            ArtifactKind::Window => "window.bin",
            ArtifactKind::LastRecord => "last_record.bin",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArtifactKind::Settings => write!(f, "settings"),
            ArtifactKind::Window => write!(f, "window"),
            ArtifactKind::LastRecord => write!(f, "last record"),
        }
    }
}

/// State that can be stored as a fixed-size blob.
pub trait Artifact: Sized {
    const KIND: ArtifactKind;
    const SIZE: usize;

    fn encode(&self) -> Result<Vec<u8>, bincode::Error>;

    /// Decode a blob of exactly `SIZE` bytes.
    fn decode(bytes: &[u8]) -> Option<Self>;
}

fn decode_exact<T: DeserializeOwned>(bytes: &[u8], size: usize) -> Option<T> {
    if bytes.len() != size {
        return None;
    }
    bincode::deserialize(bytes).ok()
}

impl Artifact for Settings {
    const KIND: ArtifactKind = ArtifactKind::Settings;
    const SIZE: usize = 5 * 4;

    fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_exact(bytes, Self::SIZE)
    }
}

impl Artifact for Record {
    const KIND: ArtifactKind = ArtifactKind::LastRecord;
    const SIZE: usize = 3 * 4;

    fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        decode_exact(bytes, Self::SIZE)
    }
}

/// On-disk form of the window: header words, then every slot up to the
/// compiled maximum. Slots beyond `window_sz` are written as zero.
#[derive(Serialize, Deserialize)]
struct WindowBlob {
    window_sz: u32,
    cursor: u32,
    lifetime_count: u32,
    last: u32,
    slots: Slots,
}

/// Sample slots serialized as a fixed tuple, so no length prefix is written.
struct Slots([u32; SLOTS]);

impl Serialize for Slots {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(SLOTS)?;
        for slot in &self.0 {
            tuple.serialize_element(slot)?;
        }
        tuple.end()
    }
}

impl<'de> Deserialize<'de> for Slots {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SlotsVisitor;

        impl<'de> Visitor<'de> for SlotsVisitor {
            type Value = Slots;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{SLOTS} window slots")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Slots, A::Error> {
                let mut slots = [0u32; SLOTS];
                for (i, slot) in slots.iter_mut().enumerate() {
                    *slot = seq
                        .next_element()?
                        .ok_or_else(|| de::Error::invalid_length(i, &self))?;
                }
                Ok(Slots(slots))
            }
        }

        deserializer.deserialize_tuple(SLOTS, SlotsVisitor)
    }
}

impl Artifact for SlidingWindowStats {
    const KIND: ArtifactKind = ArtifactKind::Window;
    const SIZE: usize = (4 + SLOTS) * 4;

    fn encode(&self) -> Result<Vec<u8>, bincode::Error> {
        let mut slots = [0u32; SLOTS];
        for (slot, &sample) in slots.iter_mut().zip(self.samples()) {
            *slot = sample;
        }
        bincode::serialize(&WindowBlob {
            window_sz: self.window_sz(),
            cursor: self.cursor() as u32,
            lifetime_count: self.lifetime_count(),
            last: self.last(),
            slots: Slots(slots),
        })
    }

    fn decode(bytes: &[u8]) -> Option<Self> {
        let blob: WindowBlob = decode_exact(bytes, Self::SIZE)?;
        if blob.window_sz == 0 || blob.window_sz > MAX_WINDOW_SZ {
            return None;
        }
        let samples = blob.slots.0[..blob.window_sz as usize].to_vec();
        SlidingWindowStats::from_parts(samples, blob.cursor as usize, blob.lifetime_count, blob.last)
    }
}
