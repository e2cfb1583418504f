// MIDI output manager - connects the engine to a hardware or virtual port

use crate::midi::bus::MidiSink;
use crate::midi::event::MidiEvent;
use midir::{MidiOutput, MidiOutputConnection};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MidiOutputError {
    #[error("failed to initialize MIDI output: {0}")]
    Init(#[from] midir::InitError),

    #[error("no MIDI output ports available")]
    NoPorts,

    #[error("MIDI output port '{0}' not found")]
    PortNotFound(String),

    #[error("failed to connect to MIDI output port '{0}': {1}")]
    Connect(String, String),
}

/// Owns a midir output connection and exposes it as a [`MidiSink`].
///
/// Connection setup happens before the clock starts ticking; the engine owns
/// no threads, so there is no reconnect monitor. Send failures after a device
/// disappears are logged and dropped, keeping the tick path infallible.
pub struct MidiOutputManager {
    connection: MidiOutputConnection,
    port_name: String,
}

impl MidiOutputManager {
    /// Names of all currently visible output ports.
    pub fn list_ports() -> Result<Vec<String>, MidiOutputError> {
        let midi_out = MidiOutput::new("looplab output")?;
        let names = midi_out
            .ports()
            .iter()
            .filter_map(|port| midi_out.port_name(port).ok())
            .collect();
        Ok(names)
    }

    /// Connect to the first available output port.
    pub fn connect_first() -> Result<Self, MidiOutputError> {
        let midi_out = MidiOutput::new("looplab output")?;
        let ports = midi_out.ports();
        let port = ports.first().ok_or(MidiOutputError::NoPorts)?;
        let port_name = midi_out
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_out
            .connect(port, "looplab")
            .map_err(|e| MidiOutputError::Connect(port_name.clone(), e.to_string()))?;

        Ok(Self {
            connection,
            port_name,
        })
    }

    /// Connect to an output port by exact name.
    pub fn connect(port_name: &str) -> Result<Self, MidiOutputError> {
        let midi_out = MidiOutput::new("looplab output")?;

        let ports = midi_out.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .map(|name| name == port_name)
                    .unwrap_or(false)
            })
            .ok_or_else(|| MidiOutputError::PortNotFound(port_name.to_string()))?;

        let connection = midi_out
            .connect(port, "looplab")
            .map_err(|e| MidiOutputError::Connect(port_name.to_string(), e.to_string()))?;

        Ok(Self {
            connection,
            port_name: port_name.to_string(),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    fn send(&mut self, event: MidiEvent) {
        if let Err(e) = self.connection.send(&event.to_bytes()) {
            log::warn!("MIDI send failed on '{}': {}", self.port_name, e);
        }
    }
}

impl MidiSink for MidiOutputManager {
    fn note_on(&mut self, channel: u8, note: u8, velocity: u8) {
        self.send(MidiEvent::NoteOn {
            channel,
            note,
            velocity,
        });
    }

    fn note_off(&mut self, channel: u8, note: u8) {
        self.send(MidiEvent::NoteOff { channel, note });
    }

    fn control_change(&mut self, channel: u8, controller: u8, value: u8) {
        self.send(MidiEvent::ControlChange {
            channel,
            controller,
            value,
        });
    }
}
