use crate::apc::{ApcMiniDevice, GRID_KEYS, SCENE_KEYS, SHIFT_KEY, TRACK_KEYS};
use crate::controller::{Controller, Device};
#[cfg(test)]
use crate::events::TestEvent;
use crate::events::{
    self, Event, FromDevice, NoteEvent, RawKeyEvent, RawLightEvent, ToDevice,
};
use crate::grid::{
    DrumKitLayout, GRID_HEIGHT, GRID_WIDTH, InstrumentGrid, PadGrid, PianoLayout,
};
use crate::skin::Skin;
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;

// Shifted track buttons, left to right: bank the grid up and down, bank
// the channel down and up.
const GRID_BANK_UP_BUTTON: u8 = 0;
const GRID_BANK_DOWN_BUTTON: u8 = 1;
const CHANNEL_BANK_DOWN_BUTTON: u8 = 2;
const CHANNEL_BANK_UP_BUTTON: u8 = 3;

// Shifted scene buttons selecting the instrument.
const PIANO_BUTTON: u8 = 5;
const DRUM_KIT_BUTTON: u8 = 6;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Mode {
    Piano,
    DrumKit,
}

struct State {
    skin: Skin,
    shift: bool,
    mode: Mode,
    piano: InstrumentGrid<PianoLayout>,
    drum_kit: InstrumentGrid<DrumKitLayout>,
}

/// The control wiring for the APC mini's instrument surface. Translates
/// raw button events into engine operations and engine output into light
/// and note events.
#[derive(Clone)]
pub struct Surface {
    events_tx: events::WeakSender,
    state: Arc<RwLock<State>>,
}

fn control_lights(state: &State) -> Vec<RawLightEvent> {
    let on = state.skin.control.on;
    let off = state.skin.control.off;
    let lit = |cond: bool| if cond { on } else { off };
    let mut lights = Vec::new();
    let track_key = |idx: u8| *TRACK_KEYS.start() + idx;
    let scene_key = |idx: u8| *SCENE_KEYS.start() + idx;
    if state.shift {
        // Scroll buttons reflect whether the move is possible.
        let can = match state.mode {
            Mode::Piano => [
                state.piano.can_grid_bank_up(),
                state.piano.can_grid_bank_down(),
                state.piano.can_channel_bank_down(),
                state.piano.can_channel_bank_up(),
            ],
            Mode::DrumKit => [
                state.drum_kit.can_grid_bank_up(),
                state.drum_kit.can_grid_bank_down(),
                state.drum_kit.can_channel_bank_down(),
                state.drum_kit.can_channel_bank_up(),
            ],
        };
        for idx in 0..8u8 {
            let color = match can.get(idx as usize) {
                Some(&possible) => lit(possible),
                None => off,
            };
            lights.push(RawLightEvent {
                key: track_key(idx),
                color,
                force: false,
            });
        }
        for idx in 0..8u8 {
            let color = match idx {
                PIANO_BUTTON => lit(state.mode == Mode::Piano),
                DRUM_KIT_BUTTON => lit(state.mode == Mode::DrumKit),
                _ => off,
            };
            lights.push(RawLightEvent {
                key: scene_key(idx),
                color,
                force: false,
            });
        }
    } else {
        // The track row is the velocity radio group: exactly the selected
        // level is lit.
        let velocity_index = match state.mode {
            Mode::Piano => state.piano.velocity_index(),
            Mode::DrumKit => state.drum_kit.velocity_index(),
        };
        for idx in 0..8u8 {
            lights.push(RawLightEvent {
                key: track_key(idx),
                color: lit(idx == velocity_index),
                force: false,
            });
        }
        for idx in 0..8u8 {
            lights.push(RawLightEvent {
                key: scene_key(idx),
                color: off,
                force: false,
            });
        }
    }
    lights
}

fn select_mode(state: &mut State, mode: Mode) {
    state.mode = mode;
    // Drop anything queued by the instrument leaving the stage; the fresh
    // render repaints every pad.
    state.piano.take_lights();
    state.drum_kit.take_lights();
    match mode {
        Mode::Piano => state.piano.render(),
        Mode::DrumKit => state.drum_kit.render(),
    }
}

impl Surface {
    pub fn new(events_tx: events::WeakSender, skin: Skin) -> anyhow::Result<Self> {
        let mut piano = InstrumentGrid::new(PianoLayout::new(&skin));
        piano.set_pads(PadGrid::new(GRID_WIDTH, GRID_HEIGHT))?;
        let mut drum_kit = InstrumentGrid::new(DrumKitLayout::new(&skin));
        drum_kit.set_pads(PadGrid::new(GRID_WIDTH, GRID_HEIGHT))?;
        let state = State {
            skin,
            shift: false,
            mode: Mode::Piano,
            piano,
            drum_kit,
        };
        Ok(Self {
            events_tx,
            state: Arc::new(RwLock::new(state)),
        })
    }

    pub fn make_device(&self) -> Arc<dyn Device> {
        Arc::new(ApcMiniDevice::new())
    }

    /// Repaint everything from scratch.
    pub fn reset(&self) -> anyhow::Result<()> {
        let Some(tx) = self.events_tx.upgrade() else {
            return Ok(());
        };
        let mut state = self.state.write().unwrap();
        state.shift = false;
        tx.send(Event::ToDevice(ToDevice::ClearLights))?;
        state.piano.take_lights();
        state.drum_kit.take_lights();
        let mut lights = match state.mode {
            Mode::Piano => {
                state.piano.render();
                state.piano.take_lights()
            }
            Mode::DrumKit => {
                state.drum_kit.render();
                state.drum_kit.take_lights()
            }
        };
        lights.extend(control_lights(&state));
        tx.send(Event::ToDevice(ToDevice::Light(lights)))?;
        log::info!("APC mini instrument surface is initialized");
        #[cfg(test)]
        events::send_test_event(&self.events_tx, TestEvent::ResetComplete);
        Ok(())
    }

    fn push_updates(&self, state: &mut State) -> anyhow::Result<()> {
        let Some(tx) = self.events_tx.upgrade() else {
            return Ok(());
        };
        let mut lights = match state.mode {
            Mode::Piano => state.piano.take_lights(),
            Mode::DrumKit => state.drum_kit.take_lights(),
        };
        lights.extend(control_lights(state));
        tx.send(Event::ToDevice(ToDevice::Light(lights)))?;
        Ok(())
    }

    fn handle_shift(&self, pressed: bool) -> anyhow::Result<()> {
        let mut state = self.state.write().unwrap();
        state.shift = pressed;
        self.push_updates(&mut state)
    }

    /// A pad plays whatever its cell is currently bound to; a cell with
    /// no note behind it plays nothing.
    fn handle_pad(&self, key: u8, velocity: u8) -> anyhow::Result<()> {
        let x = usize::from(key % 8);
        // The hardware numbers pad rows from the bottom; the pad grid from
        // the top.
        let matrix_y = GRID_HEIGHT - 1 - usize::from(key / 8);
        let pad = {
            let state = self.state.read().unwrap();
            match state.mode {
                Mode::Piano => state.piano.pad(x, matrix_y),
                Mode::DrumKit => state.drum_kit.pad(x, matrix_y),
            }
        };
        let Some(pad) = pad else {
            return Ok(());
        };
        if !pad.enabled {
            return Ok(());
        }
        let Some(tx) = self.events_tx.upgrade() else {
            return Ok(());
        };
        tx.send(Event::PlayNote(NoteEvent {
            channel: pad.channel,
            key: pad.identifier,
            velocity,
        }))?;
        Ok(())
    }

    fn handle_track(&self, idx: u8) -> anyhow::Result<()> {
        let mut state = self.state.write().unwrap();
        if state.shift {
            match (idx, state.mode) {
                (GRID_BANK_UP_BUTTON, Mode::Piano) => state.piano.grid_bank_up(),
                (GRID_BANK_UP_BUTTON, Mode::DrumKit) => state.drum_kit.grid_bank_up(),
                (GRID_BANK_DOWN_BUTTON, Mode::Piano) => state.piano.grid_bank_down(),
                (GRID_BANK_DOWN_BUTTON, Mode::DrumKit) => state.drum_kit.grid_bank_down(),
                (CHANNEL_BANK_DOWN_BUTTON, Mode::Piano) => state.piano.channel_bank_down(),
                (CHANNEL_BANK_DOWN_BUTTON, Mode::DrumKit) => state.drum_kit.channel_bank_down(),
                (CHANNEL_BANK_UP_BUTTON, Mode::Piano) => state.piano.channel_bank_up(),
                (CHANNEL_BANK_UP_BUTTON, Mode::DrumKit) => state.drum_kit.channel_bank_up(),
                _ => return Ok(()),
            }
        } else {
            match state.mode {
                Mode::Piano => state.piano.set_velocity(idx),
                Mode::DrumKit => state.drum_kit.set_velocity(idx),
            }
        }
        self.push_updates(&mut state)
    }

    fn handle_scene(&self, idx: u8) -> anyhow::Result<()> {
        let mut state = self.state.write().unwrap();
        if !state.shift {
            // Unshifted scene buttons belong to the session surface, which
            // this driver doesn't provide.
            return Ok(());
        }
        match idx {
            PIANO_BUTTON => {
                if state.mode == Mode::Piano {
                    // Re-pressing the active instrument's button flips the
                    // keyboard layout.
                    state.piano.toggle_layout();
                } else {
                    select_mode(&mut state, Mode::Piano);
                }
            }
            DRUM_KIT_BUTTON => {
                if state.mode != Mode::DrumKit {
                    select_mode(&mut state, Mode::DrumKit);
                }
            }
            _ => return Ok(()),
        }
        self.push_updates(&mut state)
    }

    pub fn handle_raw_event(&self, msg: FromDevice) -> anyhow::Result<()> {
        let FromDevice::Key(RawKeyEvent { key, velocity }) = msg;
        let pressed = velocity > 0;
        if key == SHIFT_KEY {
            self.handle_shift(pressed)?;
        } else if GRID_KEYS.contains(&key) {
            self.handle_pad(key, velocity)?;
        } else if TRACK_KEYS.contains(&key) {
            if pressed {
                self.handle_track(key - TRACK_KEYS.start())?;
            }
        } else if SCENE_KEYS.contains(&key) {
            if pressed {
                self.handle_scene(key - SCENE_KEYS.start())?;
            }
        } else {
            log::trace!("unmapped key {key}");
        }
        #[cfg(test)]
        events::send_test_event(&self.events_tx, TestEvent::HandledKey);
        Ok(())
    }

    pub fn main_event_loop(&self, event: Event) -> anyhow::Result<()> {
        match event {
            Event::Shutdown | Event::ToDevice(_) | Event::PlayNote(_) => {}
            Event::Reset => self.reset()?,
            #[cfg(test)]
            Event::TestSync => events::send_test_event(&self.events_tx, TestEvent::Sync),
            #[cfg(test)]
            Event::TestEvent(_) => {}
        }
        Ok(())
    }
}

pub async fn start_controller(
    surface: Surface,
    controller: Controller,
    mut events_rx: events::Receiver,
) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
    // Communicating with the MIDI device must be sync. The rest of the
    // application is async. To bridge the gap, we create flume channels to
    // relay back and forth.
    let (to_device_tx, to_device_rx) = flume::unbounded::<ToDevice>();
    let (from_device_tx, from_device_rx) = flume::unbounded::<FromDevice>();
    tokio::spawn(async move {
        while let Some(event) = events::receive_check_lag(&mut events_rx, Some("controller")).await
        {
            let Event::ToDevice(event) = event else {
                continue;
            };
            if let Err(e) = to_device_tx.send_async(event).await {
                log::error!("failed to relay message to device: {e}");
            }
        }
    });
    let device = surface.make_device();
    tokio::spawn(async move {
        while let Ok(msg) = from_device_rx.recv_async().await {
            if let Err(e) = surface.handle_raw_event(msg) {
                log::error!("error handling raw APC mini event: {e}");
            }
        }
    });
    controller.run(to_device_rx, from_device_tx, device)
}

pub async fn start_surface(
    controller: Option<Controller>,
    surface: Surface,
    mut events_rx: events::Receiver,
) -> anyhow::Result<JoinHandle<anyhow::Result<()>>> {
    let controller_h = match controller {
        None => None,
        Some(c) => {
            // start_controller doesn't return until the device is
            // initialized.
            Some(start_controller(surface.clone(), c, events_rx.resubscribe()).await?)
        }
    };
    // Start the background task after the device is initialized so we're
    // fully up before this function returns.
    Ok(tokio::task::spawn(async move {
        while let Some(event) = events::receive_check_lag(&mut events_rx, Some("surface")).await {
            surface.main_event_loop(event)?;
        }
        if let Some(h) = controller_h {
            h.await??;
        }
        Ok(())
    }))
}
