use std::fmt::Display;

pub mod apc;
pub mod controller;
pub mod events;
pub mod grid;
pub mod midi_player;
pub mod skin;
pub mod surface;
#[cfg(test)]
pub mod test_util;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum DeviceType {
    Empty,
    ApcMini,
}

/// midir's connect errors own the port and aren't Sync, so convert by
/// formatting.
pub fn to_anyhow<E: Display>(e: E) -> anyhow::Error {
    anyhow::anyhow!("{e}")
}
