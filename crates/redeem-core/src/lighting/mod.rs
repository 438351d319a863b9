//! Smart-bulb control.
//!
//! The router talks to bulbs through [`LightController`]; [`lifx`] provides
//! the LAN implementation used in production.

pub mod lifx;

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

pub use lifx::{LifxBulb, LifxLights, discover};

/// Which of the two fixed bulbs a colour change targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulbSlot {
    Bed = 0,
    Ceiling = 1,
}

impl BulbSlot {
    /// Maps a selector in `0..=1` to a slot; any odd value selects the ceiling bulb.
    pub fn from_index(index: u64) -> Self {
        if index % 2 == 0 {
            BulbSlot::Bed
        } else {
            BulbSlot::Ceiling
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BulbSlot::Bed => "bed",
            BulbSlot::Ceiling => "ceiling",
        }
    }
}

impl std::fmt::Display for BulbSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Hue, saturation, brightness and colour temperature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsbk {
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub kelvin: u16,
}

/// Hardware addresses of the two bulbs, as `aa:bb:cc:dd:ee:ff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulbAddresses {
    pub bed: String,
    pub ceiling: String,
}

impl Default for BulbAddresses {
    fn default() -> Self {
        Self {
            bed: "d0:73:d5:66:d5:ec".to_string(),
            ceiling: "d0:73:d5:64:76:ac".to_string(),
        }
    }
}

/// Trait for setting bulb colours.
#[async_trait]
pub trait LightController: Send + Sync {
    async fn set_color(&self, slot: BulbSlot, color: Hsbk, transition: Duration) -> Result<()>;
}
