use crate::controller::Device;
use crate::events::{Color, FromDevice, RawKeyEvent, RawLightEvent, ToDevice};
use midir::MidiOutputConnection;
use midly::MidiMessage;
use midly::live::LiveEvent;
use std::sync::Mutex;

// Button note numbers on the hardware. The grid is 0..=63 from the bottom
// left, the track buttons run along the bottom, the scene buttons down the
// right side, and shift sits below them. The fader strip is CC 48..=56.
pub const GRID_KEYS: std::ops::RangeInclusive<u8> = 0..=63;
pub const TRACK_KEYS: std::ops::RangeInclusive<u8> = 64..=71;
pub const SCENE_KEYS: std::ops::RangeInclusive<u8> = 82..=89;
pub const SHIFT_KEY: u8 = 98;

/// Last color sent per button note. LEDs are set by note-on messages with
/// the color code as velocity; resending the same code is wasted traffic,
/// so sends are suppressed unless the color changed or the event carries
/// the force flag.
struct LightCache {
    last: [Option<Color>; 128],
}

impl LightCache {
    fn new() -> Self {
        Self { last: [None; 128] }
    }

    fn filter(&mut self, events: Vec<RawLightEvent>) -> Vec<RawLightEvent> {
        events
            .into_iter()
            .filter(|e| {
                let slot = &mut self.last[e.key as usize];
                let changed = *slot != Some(e.color);
                *slot = Some(e.color);
                e.force || changed
            })
            .collect()
    }

    fn clear(&mut self) {
        self.last = [None; 128];
    }
}

/// The APC mini as seen from the MIDI side.
pub struct ApcMiniDevice {
    lights: Mutex<LightCache>,
}

impl Default for ApcMiniDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl ApcMiniDevice {
    pub fn new() -> Self {
        Self {
            lights: Mutex::new(LightCache::new()),
        }
    }

    fn set_light(
        output_connection: &mut MidiOutputConnection,
        key: u8,
        color: Color,
    ) -> anyhow::Result<()> {
        // Note on, channel 0; the velocity byte is the color code.
        output_connection.send(&[0x90, key, color.apc_velocity()])?;
        Ok(())
    }

    fn clear_lights(&self, output_connection: &mut MidiOutputConnection) -> anyhow::Result<()> {
        for key in GRID_KEYS.chain(TRACK_KEYS).chain(SCENE_KEYS) {
            Self::set_light(output_connection, key, Color::Off)?;
        }
        self.lights.lock().unwrap().clear();
        Ok(())
    }
}

impl Device for ApcMiniDevice {
    fn on_midi(&self, event: LiveEvent) -> Option<FromDevice> {
        match event {
            LiveEvent::Midi { message, .. } => match message {
                MidiMessage::NoteOn { key, vel } => Some(FromDevice::Key(RawKeyEvent {
                    key: key.as_int(),
                    velocity: vel.as_int(),
                })),
                MidiMessage::NoteOff { key, .. } => Some(FromDevice::Key(RawKeyEvent {
                    key: key.as_int(),
                    velocity: 0,
                })),
                MidiMessage::Controller { controller, value } => {
                    // The fader strip. Mixer control is out of scope here.
                    log::trace!(
                        "ignoring fader cc {} = {}",
                        controller.as_int(),
                        value.as_int()
                    );
                    None
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn handle_event(
        &self,
        event: ToDevice,
        output_connection: &mut MidiOutputConnection,
    ) -> anyhow::Result<()> {
        match event {
            ToDevice::Light(events) => {
                let events = self.lights.lock().unwrap().filter(events);
                for e in events {
                    Self::set_light(output_connection, e.key, e.color)?;
                }
                Ok(())
            }
            ToDevice::ClearLights => self.clear_lights(output_connection),
        }
    }

    fn init(&self, output_connection: &mut MidiOutputConnection) -> anyhow::Result<()> {
        self.clear_lights(output_connection)
    }

    fn shutdown(&self, output_connection: &mut MidiOutputConnection) {
        let _ = self.clear_lights(output_connection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn light(key: u8, color: Color, force: bool) -> RawLightEvent {
        RawLightEvent { key, color, force }
    }

    #[test]
    fn test_light_cache() {
        let mut cache = LightCache::new();
        // First sight of a key always goes through.
        let out = cache.filter(vec![light(0, Color::Green, false)]);
        assert_eq!(out.len(), 1);
        // Same color again is suppressed unless forced.
        assert!(cache.filter(vec![light(0, Color::Green, false)]).is_empty());
        assert_eq!(cache.filter(vec![light(0, Color::Green, true)]).len(), 1);
        // A color change goes through.
        assert_eq!(cache.filter(vec![light(0, Color::Red, false)]).len(), 1);
        // Clearing forgets everything.
        cache.clear();
        assert_eq!(cache.filter(vec![light(0, Color::Red, false)]).len(), 1);
    }

    #[test]
    fn test_on_midi() {
        let device = ApcMiniDevice::new();
        let note_on = LiveEvent::parse(&[0x90, 5, 127]).unwrap();
        let Some(FromDevice::Key(e)) = device.on_midi(note_on) else {
            panic!("expected a key event");
        };
        assert_eq!((e.key, e.velocity), (5, 127));
        // Hardware sends note off on release.
        let note_off = LiveEvent::parse(&[0x80, 5, 64]).unwrap();
        let Some(FromDevice::Key(e)) = device.on_midi(note_off) else {
            panic!("expected a key event");
        };
        assert_eq!((e.key, e.velocity), (5, 0));
        // Fader movement is ignored.
        let cc = LiveEvent::parse(&[0xB0, 48, 100]).unwrap();
        assert!(device.on_midi(cc).is_none());
    }
}
