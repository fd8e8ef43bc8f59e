use serde::{Deserialize, Serialize};
use std::fmt;

/// Letters used for the auditory stream when no other alphabet is configured
pub const DEFAULT_AUDIO_KEYS: [&str; 9] = ["a", "c", "g", "h", "k", "l", "q", "r", "s"];

/// One of the two independent stimulus channels
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum Modality {
    Visual,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 2] = [Modality::Visual, Modality::Audio];
}

/// A cell of the game grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualCoordinate {
    pub x: u8,
    pub y: u8,
}

impl VisualCoordinate {
    pub const fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }
}

impl From<(u8, u8)> for VisualCoordinate {
    fn from(v: (u8, u8)) -> Self {
        VisualCoordinate { x: v.0, y: v.1 }
    }
}

/// Square game grid. The center cell is the start/stop control and never a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub size: u8,
}

impl Default for Grid {
    fn default() -> Self {
        Self { size: 3 }
    }
}

impl Grid {
    pub fn new(size: u8) -> Self {
        Self { size }
    }

    pub fn center(&self) -> VisualCoordinate {
        VisualCoordinate::new(self.size / 2, self.size / 2)
    }

    pub fn contains(&self, coordinate: VisualCoordinate) -> bool {
        coordinate.x < self.size && coordinate.y < self.size
    }

    pub fn cells(&self) -> impl Iterator<Item = VisualCoordinate> + '_ {
        (0..self.size).flat_map(move |x| (0..self.size).map(move |y| VisualCoordinate::new(x, y)))
    }

    /// Every cell that may be drawn as a visual stimulus
    pub fn stimulus_cells(&self) -> Vec<VisualCoordinate> {
        let center = self.center();
        self.cells().filter(|c| *c != center).collect()
    }
}

/// Opaque identifier of an auditory stimulus, mapped to a playable asset by the presenter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioKey(String);

impl AudioKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn default_audio_keys() -> Vec<AudioKey> {
    DEFAULT_AUDIO_KEYS.iter().map(|k| AudioKey::new(*k)).collect()
}
