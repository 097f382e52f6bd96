use crate::events;
use crate::events::Event;
use crate::to_anyhow;
use midir::MidiOutput;
use midir::os::unix::VirtualOutput;

/// Play the surface's note events on a virtual output port. Each note
/// arrives with the feedback channel of the grid cell that produced it, so
/// notes from different banks land on different channels and a synth can
/// map them to separate instruments.
pub async fn play_midi(mut events_rx: events::Receiver) -> anyhow::Result<()> {
    let (tx, rx) = flume::unbounded();
    let h = tokio::spawn(async move {
        while let Some(event) = events::receive_check_lag(&mut events_rx, Some("midi player")).await
        {
            let Event::PlayNote(e) = event else {
                continue;
            };
            tx.send_async(e).await.unwrap();
        }
    });

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let midi_out = MidiOutput::new("apcmini-kbd")?;
        let mut output_connection = midi_out.create_virtual("APC mini Keys").map_err(to_anyhow)?;
        while let Ok(e) = rx.recv() {
            // Note on with velocity 0 doubles as note off.
            output_connection.send(&[0x90 | (e.channel & 0x0f), e.key, e.velocity])?;
        }
        Ok(())
    })
    .await
    .unwrap()?;
    h.await?;
    Ok(())
}
