//! Numeric speech settings and their bounds.
//!
//! Every setting lives in a closed `[minimum, maximum]` range and moves in
//! fixed steps of [`Setting::STEP`]. Stepping clamps at the bounds, so once a
//! value sits on a bound further steps in that direction are no-ops.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::CadenceError;

/// Bounded numeric setting kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    Rate,
    PitchMultiplier,
    Volume,
}

impl Setting {
    /// Step applied by `increment`/`decrement`, shared by every kind.
    pub const STEP: f32 = 0.1;

    pub const ALL: [Setting; 3] = [Setting::Rate, Setting::PitchMultiplier, Setting::Volume];

    pub fn default_value(self) -> f32 {
        match self {
            Setting::Rate => 0.5,
            Setting::PitchMultiplier => 1.0,
            Setting::Volume => 1.0,
        }
    }

    pub fn minimum_value(self) -> f32 {
        match self {
            Setting::Rate => 0.0,
            Setting::PitchMultiplier => 0.5,
            Setting::Volume => 0.0,
        }
    }

    pub fn maximum_value(self) -> f32 {
        match self {
            Setting::Rate => 1.0,
            Setting::PitchMultiplier => 2.0,
            Setting::Volume => 1.0,
        }
    }

    /// Preference key the value is persisted under
    pub fn key(self) -> &'static str {
        match self {
            Setting::Rate => "cadence.rate",
            Setting::PitchMultiplier => "cadence.pitch_multiplier",
            Setting::Volume => "cadence.volume",
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(self.minimum_value(), self.maximum_value())
    }

    /// One step up, never past the maximum.
    pub fn increment(self, current: f32) -> f32 {
        (current + Self::STEP).min(self.maximum_value())
    }

    /// One step down, never below the minimum.
    pub fn decrement(self, current: f32) -> f32 {
        (current - Self::STEP).max(self.minimum_value())
    }

    pub fn incrementable(self, current: f32) -> bool {
        current < self.maximum_value()
    }

    pub fn decrementable(self, current: f32) -> bool {
        current > self.minimum_value()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Setting::Rate => "rate",
            Setting::PitchMultiplier => "pitch",
            Setting::Volume => "volume",
        }
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Setting {
    type Err = CadenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rate" => Ok(Setting::Rate),
            "pitch" | "pitch_multiplier" | "pitchmultiplier" => Ok(Setting::PitchMultiplier),
            "volume" => Ok(Setting::Volume),
            other => Err(CadenceError::Config(format!("Unknown setting: {}", other))),
        }
    }
}
