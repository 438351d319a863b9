//! Reward titles and the parameters derived from user input.

use rand::Rng;

use crate::crypto::checksum;
use crate::lighting::{BulbSlot, Hsbk};

/// Hue values wrap at this modulus; it also splits the number space between bulbs.
pub const HUE_MODULUS: u64 = 65535;
pub const FULL_SATURATION: u16 = 65535;
pub const FULL_BRIGHTNESS: u16 = 65535;
pub const LIGHTS_KELVIN: u16 = 3200;

/// The closed set of rewards that trigger an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reward {
    Lights,
    EndStream,
    SilenceMe,
    SimpBucksPremium,
    Scrollo,
    Unknown(String),
}

impl Reward {
    /// Matches a reward title exactly and case-sensitively.
    pub fn from_title(title: &str) -> Self {
        match title {
            "lights" => Reward::Lights,
            "end the stream" => Reward::EndStream,
            "silence me" => Reward::SilenceMe,
            "SimpBucks Premium" => Reward::SimpBucksPremium,
            "scrollo" => Reward::Scrollo,
            other => Reward::Unknown(other.to_string()),
        }
    }
}

/// Interprets user input as a number.
///
/// Input made only of ASCII digits that fits in a u64 is used as-is; anything
/// else (signs included) falls back to its CRC-32.
pub fn input_number(user_input: &str) -> u64 {
    let digits_only = !user_input.is_empty() && user_input.bytes().all(|b| b.is_ascii_digit());
    if digits_only {
        if let Ok(n) = user_input.parse::<u64>() {
            return n;
        }
    }
    u64::from(checksum(user_input))
}

/// Bulb and colour chosen for the "lights" reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightSelection {
    pub slot: BulbSlot,
    pub color: Hsbk,
}

impl LightSelection {
    pub fn from_number(n: u64) -> Self {
        let slot = BulbSlot::from_index((n / HUE_MODULUS) % 2);
        let hue = (n % HUE_MODULUS) as u16;
        Self {
            slot,
            color: Hsbk {
                hue,
                saturation: FULL_SATURATION,
                brightness: FULL_BRIGHTNESS,
                kelvin: LIGHTS_KELVIN,
            },
        }
    }

    pub fn from_input(user_input: &str) -> Self {
        Self::from_number(input_number(user_input))
    }
}

/// Number of equally likely outcomes when picking a sound.
pub const SOUND_OUTCOMES: u32 = 10;
/// The one outcome that plays the rare sound.
pub const RARE_SOUND_OUTCOME: u32 = 5;

/// Returns true for the one-in-ten roll that plays the rare sound.
pub fn roll_rare_sound<R: Rng>(rng: &mut R) -> bool {
    rng.gen_range(0..SOUND_OUTCOMES) == RARE_SOUND_OUTCOME
}
