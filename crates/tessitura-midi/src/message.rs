//! Channel-voice message decoding.
//!
//! Only note-on and note-off matter to the router. Everything else on the
//! bus (control changes, clock, sysex fragments, short messages) decodes to
//! `None` and is dropped.

/// Note-off status nibble.
pub const NOTE_OFF: u8 = 0x80;
/// Note-on status nibble.
pub const NOTE_ON: u8 = 0x90;

/// What a note message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoteCommand {
    /// Start sounding the pitch.
    On,
    /// Stop sounding the pitch.
    Off,
}

/// A decoded note-on or note-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteMessage {
    /// On or off. A note-on with velocity 0 decodes as [`NoteCommand::Off`].
    pub command: NoteCommand,
    /// Channel index, 0..=15.
    pub channel: u8,
    /// Pitch, 0..=127.
    pub pitch: u8,
    /// Velocity, 0..=127.
    pub velocity: u8,
}

/// Decodes `[status, data1, data2, ..]` into a note message.
///
/// ```rust
/// use tessitura_midi::message::{NoteCommand, decode};
///
/// let msg = decode(&[0x91, 60, 0]).unwrap();
/// assert_eq!(msg.command, NoteCommand::Off);
/// assert_eq!(msg.channel, 1);
/// assert!(decode(&[0xB0, 7, 100]).is_none());
/// ```
pub fn decode(bytes: &[u8]) -> Option<NoteMessage> {
    let &[status, data1, data2, ..] = bytes else {
        return None;
    };
    let pitch = data1 & 0x7F;
    let velocity = data2 & 0x7F;
    let command = match status & 0xF0 {
        NOTE_ON if velocity > 0 => NoteCommand::On,
        NOTE_ON | NOTE_OFF => NoteCommand::Off,
        _ => return None,
    };
    Some(NoteMessage {
        command,
        channel: status & 0x0F,
        pitch,
        velocity,
    })
}

impl NoteMessage {
    /// Raw bytes of the message (note-offs encode as status 0x80).
    pub fn to_bytes(&self) -> [u8; 3] {
        let status = match self.command {
            NoteCommand::On => NOTE_ON,
            NoteCommand::Off => NOTE_OFF,
        };
        [status | (self.channel & 0x0F), self.pitch & 0x7F, self.velocity & 0x7F]
    }
}

/// Raw note-on bytes.
pub fn note_on(channel: u8, pitch: u8, velocity: u8) -> [u8; 3] {
    [NOTE_ON | (channel & 0x0F), pitch & 0x7F, velocity & 0x7F]
}

/// Raw note-off bytes.
pub fn note_off(channel: u8, pitch: u8) -> [u8; 3] {
    [NOTE_OFF | (channel & 0x0F), pitch & 0x7F, 0]
}
