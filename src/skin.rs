use crate::events::Color;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Colors for the piano keyboard layout. `base` marks the first scale
/// degree, `lit` the other naturals, `unlit` the accidentals and any cell
/// past the MIDI pitch range, and `middle_c` overrides whatever the scale
/// says for pitch 60.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PianoColors {
    pub base: Color,
    pub lit: Color,
    pub unlit: Color,
    pub middle_c: Color,
}

impl Default for PianoColors {
    fn default() -> Self {
        Self {
            base: Color::Green,
            lit: Color::Amber,
            unlit: Color::Off,
            middle_c: Color::Red,
        }
    }
}

/// One color per group of 16 drum pads, cycled as the grid banks through
/// the pad index space.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DrumKitColors {
    pub pads: [Color; 4],
}

impl Default for DrumKitColors {
    fn default() -> Self {
        Self {
            pads: [Color::Red, Color::Off, Color::Amber, Color::Green],
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ControlColors {
    pub on: Color,
    pub off: Color,
}

impl Default for ControlColors {
    fn default() -> Self {
        Self {
            on: Color::On,
            off: Color::Off,
        }
    }
}

/// The full color policy for the surface. Built once at startup, either
/// from the hardware defaults or from a TOML file, and passed to the
/// layouts at construction.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Skin {
    pub piano: PianoColors,
    pub drum_kit: DrumKitColors,
    pub control: ControlColors,
}

impl Skin {
    pub fn load(file: &Path) -> anyhow::Result<Self> {
        let data = fs::read_to_string(file)?;
        let skin: Skin = toml::from_str(&data)?;
        Ok(skin)
    }
}
