use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{RwLock, broadcast};

/// The two-LED colors the APC mini can show on its grid pads. Track and
/// scene buttons have a single LED; for those, anything other than `Off`
/// reads as "lit".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Color {
    #[default]
    Off,
    Green,
    GreenBlink,
    Red,
    RedBlink,
    Amber,
    AmberBlink,
    On,
}

impl Color {
    /// The velocity byte that selects this color when sent as a note-on to
    /// a button's own note number.
    pub fn apc_velocity(self) -> u8 {
        match self {
            Color::Off => 0,
            Color::Green => 1,
            Color::GreenBlink => 2,
            Color::Red => 3,
            Color::RedBlink => 4,
            Color::Amber => 5,
            Color::AmberBlink => 6,
            Color::On => 127,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawKeyEvent {
    /// The button's note number as sent by the hardware
    pub key: u8,
    /// 0..127, 0 = released
    pub velocity: u8,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RawLightEvent {
    /// The button's note number
    pub key: u8,
    pub color: Color,
    /// Send even if the device already shows this color
    pub force: bool,
}

/// A note to be played on the virtual output port. The channel is the
/// feedback channel of the grid cell that produced the note.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct NoteEvent {
    pub channel: u8,
    pub key: u8,
    /// 0..127, 0 = note off
    pub velocity: u8,
}

#[derive(Clone, Debug)]
pub enum FromDevice {
    Key(RawKeyEvent),
}

#[derive(Clone, Debug)]
pub enum ToDevice {
    Light(Vec<RawLightEvent>),
    ClearLights,
}

#[cfg(test)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TestEvent {
    ResetComplete,
    HandledKey,
    Sync,
}

#[derive(Clone, Debug)]
pub enum Event {
    Shutdown,
    Reset,
    ToDevice(ToDevice),
    PlayNote(NoteEvent),
    #[cfg(test)]
    TestEvent(TestEvent),
    #[cfg(test)]
    TestSync,
}

pub type UpgradedSender = broadcast::Sender<Event>;
pub type WeakSender = broadcast::WeakSender<Event>;
pub type Receiver = broadcast::Receiver<Event>;

pub struct Events {
    tx: RwLock<Option<UpgradedSender>>,
    rx: Receiver,
}

impl Default for Events {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub fn send_test_event(events_tx: &WeakSender, test_event: TestEvent) {
    if let Some(tx) = events_tx.upgrade() {
        tx.send(Event::TestEvent(test_event)).unwrap();
    }
}

/// Receive an event, ignoring lag
pub async fn receive_check_lag(rx: &mut Receiver, warn_prefix: Option<&str>) -> Option<Event> {
    loop {
        let event = rx.recv().await;
        match event {
            Ok(Event::Shutdown) => return None,
            Ok(event) => return Some(event),
            Err(err) => match err {
                RecvError::Closed => return None,
                RecvError::Lagged(n) => {
                    if let Some(p) = warn_prefix {
                        log::warn!("{p}: missed {n} events");
                    }
                    continue;
                }
            },
        }
    }
}

impl Events {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(1000);
        Self {
            tx: RwLock::new(Some(tx)),
            rx,
        }
    }

    pub async fn sender(&self) -> WeakSender {
        let tx = self
            .tx
            .read()
            .await
            .clone()
            .expect("sender called after shutdown");
        tx.downgrade()
    }

    pub fn receiver(&self) -> Receiver {
        self.rx.resubscribe()
    }

    pub async fn shutdown(&self) {
        self.tx.write().await.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apc_velocity() {
        // Color codes from the APC mini manual: 0 off, odd steady, even blink.
        assert_eq!(Color::Off.apc_velocity(), 0);
        assert_eq!(Color::Green.apc_velocity(), 1);
        assert_eq!(Color::GreenBlink.apc_velocity(), 2);
        assert_eq!(Color::Red.apc_velocity(), 3);
        assert_eq!(Color::RedBlink.apc_velocity(), 4);
        assert_eq!(Color::Amber.apc_velocity(), 5);
        assert_eq!(Color::AmberBlink.apc_velocity(), 6);
        assert_eq!(Color::On.apc_velocity(), 127);
    }
}
