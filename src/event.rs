//! All sort of events and their encoders and decoders.

use crate::{
    prelude::*,
    primitive::{peek_u8, read_u8, write_bytes, write_u8},
    vlq,
};
use std::hash::{Hash, Hasher};

/// Status byte that introduces a meta event.
const META_STATUS: u8 = 0xFF;
/// Status byte that introduces a system exclusive event.
const SYSEX_STATUS: u8 = 0xF0;
/// Byte that terminates a system exclusive event.
const SYSEX_END: u8 = 0xF7;

/// Represents a single event in a track within an SMF file.
///
/// Consists of a delta time (in MIDI ticks relative to the previous event) and the actual event.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TrackEvent {
    /// How many MIDI ticks after the previous event should this event fire.
    pub delta: u32,
    /// The type of event along with event-specific data.
    pub kind: EventKind,
}
impl TrackEvent {
    /// Create an event firing `delta` ticks after the previous event in the same track.
    #[inline]
    pub fn new(delta: u32, kind: impl Into<EventKind>) -> TrackEvent {
        TrackEvent {
            delta,
            kind: kind.into(),
        }
    }

    /// How many bytes the event takes up on the wire, excluding its delta-time prefix.
    #[inline]
    pub fn wire_length(&self) -> u32 {
        self.kind.wire_length()
    }

    /// How many bytes the event takes up on the wire, including its delta-time prefix.
    #[inline]
    pub fn encoded_len(&self) -> u64 {
        vlq::encoded_len(self.delta) as u64 + self.wire_length() as u64
    }

    /// Write the delta-time followed by the event itself.
    pub fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        vlq::write(out, self.delta)?;
        self.kind.encode(out)?;
        Ok(())
    }

    /// Read a single event, returning it along with the amount of bytes it took up, delta-time
    /// included.
    ///
    /// In case of failure the source might be left in the middle of an event!
    pub fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(TrackEvent, usize)> {
        let (delta, delta_len) = vlq::decode(src).context("failed to read event deltatime")?;
        let (kind, kind_len) = EventKind::decode(src).context("failed to parse event")?;
        Ok((TrackEvent { delta, kind }, delta_len + kind_len))
    }
}

/// Represents the different kinds of SMF events and their associated data.
///
/// It notably does *not* include the timing of the event; the `TrackEvent` struct is responsible
/// for this.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub enum EventKind {
    /// A message associated to a MIDI channel carrying musical data.
    ///
    /// Usually, the bulk of MIDI data is these kind of messages.
    Channel(ChannelMessage),
    /// A meta event, giving extra information for correct playback, like tempo, song name,
    /// lyrics, etc...
    Meta(MetaEvent),
    /// A System Exclusive message, carrying manufacturer-specific data.
    SysEx(SysEx),
}
impl EventKind {
    /// How many bytes the event takes up on the wire, excluding any delta-time.
    ///
    /// Saturates at `u32::MAX` for payloads too large to be encoded.
    pub fn wire_length(&self) -> u32 {
        match self {
            EventKind::Channel(msg) => msg.wire_length(),
            EventKind::Meta(meta) => meta.wire_length(),
            EventKind::SysEx(sysex) => sysex.wire_length(),
        }
    }

    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        match self {
            EventKind::Channel(msg) => msg.encode(out),
            EventKind::Meta(meta) => meta.encode(out),
            EventKind::SysEx(sysex) => sysex.encode(out),
        }
    }

    /// Dispatch on the leading status byte.
    ///
    /// There is no running status: every event must carry its own status byte.
    fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(EventKind, usize)> {
        let status = peek_u8(src).context("failed to read status")?;
        match status {
            META_STATUS => {
                let (meta, len) =
                    MetaEvent::decode(src).context("failed to read meta event")?;
                Ok((EventKind::Meta(meta), len))
            }
            SYSEX_STATUS => {
                let (sysex, len) = SysEx::decode(src).context("failed to read sysex event")?;
                Ok((EventKind::SysEx(sysex), len))
            }
            0x80..=0xEF => {
                let (msg, len) =
                    ChannelMessage::decode(src).context("failed to read channel message")?;
                Ok((EventKind::Channel(msg), len))
            }
            _ => bail!(ErrorKind::UnknownEventType(status)),
        }
    }

    /// Whether this is the `EndOfTrack` meta event.
    #[inline]
    pub fn is_end_of_track(&self) -> bool {
        matches!(self, EventKind::Meta(meta) if meta.meta_type == MetaType::EndOfTrack)
    }
}
impl From<ChannelMessage> for EventKind {
    #[inline]
    fn from(msg: ChannelMessage) -> EventKind {
        EventKind::Channel(msg)
    }
}
impl From<MetaEvent> for EventKind {
    #[inline]
    fn from(meta: MetaEvent) -> EventKind {
        EventKind::Meta(meta)
    }
}
impl From<SysEx> for EventKind {
    #[inline]
    fn from(sysex: SysEx) -> EventKind {
        EventKind::SysEx(sysex)
    }
}

/// The type of a channel message, stored in the top nibble of its status byte.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
#[repr(u8)]
pub enum MessageKind {
    /// Stop playing a note.
    NoteOff = 0x8,
    /// Start playing a note.
    ///
    /// Note that by convention a `NoteOn` message with a velocity of 0 is equivalent to a
    /// `NoteOff`.
    NoteOn = 0x9,
    /// Modify the velocity of a note after it has been played.
    PolyAftertouch = 0xA,
    /// Modify the value of a MIDI controller.
    Controller = 0xB,
    /// Change the program (also known as instrument) for a channel.
    ProgramChange = 0xC,
    /// Change the note velocity of a whole channel at once, without starting new notes.
    ChannelAftertouch = 0xD,
    /// Set the pitch bend value for the entire channel.
    PitchBend = 0xE,
}
impl MessageKind {
    /// Get the message kind from the top nibble of a status byte.
    pub fn from_status(status: u8) -> Option<MessageKind> {
        use self::MessageKind::*;
        Some(match status >> 4 {
            0x8 => NoteOff,
            0x9 => NoteOn,
            0xA => PolyAftertouch,
            0xB => Controller,
            0xC => ProgramChange,
            0xD => ChannelAftertouch,
            0xE => PitchBend,
            _ => return None,
        })
    }

    /// The top nibble of the status byte for this kind of message.
    #[inline]
    pub fn status_nibble(self) -> u8 {
        self as u8
    }

    /// Whether messages of this kind carry a second data byte.
    ///
    /// Only `ProgramChange` and `ChannelAftertouch` omit it.
    #[inline]
    pub fn has_data2(self) -> bool {
        !matches!(
            self,
            MessageKind::ProgramChange | MessageKind::ChannelAftertouch
        )
    }
}

/// A MIDI message associated to a channel.
///
/// The channel and data bytes are clamped to their legal ranges on construction: channels above
/// 15 become 15 and data bytes above 127 become 127.
/// For kinds without a second data byte, `data2` is always 0.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct ChannelMessage {
    kind: MessageKind,
    channel: u4,
    data1: u7,
    data2: u7,
}
impl ChannelMessage {
    /// Create a channel message, clamping out-of-range values.
    pub fn new(kind: MessageKind, channel: u8, data1: u8, data2: u8) -> ChannelMessage {
        ChannelMessage {
            kind,
            channel: u4::new(channel),
            data1: u7::new(data1),
            data2: if kind.has_data2() {
                u7::new(data2)
            } else {
                u7::new(0)
            },
        }
    }

    #[inline]
    pub fn note_off(channel: u8, key: u8, vel: u8) -> ChannelMessage {
        Self::new(MessageKind::NoteOff, channel, key, vel)
    }

    #[inline]
    pub fn note_on(channel: u8, key: u8, vel: u8) -> ChannelMessage {
        Self::new(MessageKind::NoteOn, channel, key, vel)
    }

    #[inline]
    pub fn poly_aftertouch(channel: u8, key: u8, vel: u8) -> ChannelMessage {
        Self::new(MessageKind::PolyAftertouch, channel, key, vel)
    }

    #[inline]
    pub fn controller(channel: u8, controller: u8, value: u8) -> ChannelMessage {
        Self::new(MessageKind::Controller, channel, controller, value)
    }

    #[inline]
    pub fn program_change(channel: u8, program: u8) -> ChannelMessage {
        Self::new(MessageKind::ProgramChange, channel, program, 0)
    }

    #[inline]
    pub fn channel_aftertouch(channel: u8, vel: u8) -> ChannelMessage {
        Self::new(MessageKind::ChannelAftertouch, channel, vel, 0)
    }

    /// Create a pitch bend message from a 14-bit value, where `0x2000` means no bend.
    ///
    /// Values above `0x3FFF` are clamped.
    #[inline]
    pub fn pitch_bend(channel: u8, bend: u16) -> ChannelMessage {
        let bend = bend.min(0x3FFF);
        Self::new(
            MessageKind::PitchBend,
            channel,
            (bend & 0x7F) as u8,
            (bend >> 7) as u8,
        )
    }

    #[inline]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    #[inline]
    pub fn channel(&self) -> u4 {
        self.channel
    }

    #[inline]
    pub fn data1(&self) -> u7 {
        self.data1
    }

    /// The second data byte, always 0 for `ProgramChange` and `ChannelAftertouch`.
    #[inline]
    pub fn data2(&self) -> u7 {
        self.data2
    }

    /// The 14-bit pitch bend value, if this is a pitch bend message.
    #[inline]
    pub fn bend(&self) -> Option<u16> {
        match self.kind {
            MessageKind::PitchBend => {
                Some((self.data2.as_int() as u16) << 7 | self.data1.as_int() as u16)
            }
            _ => None,
        }
    }

    /// The status byte: the message kind in the top nibble and the channel in the bottom one.
    #[inline]
    pub fn status(&self) -> u8 {
        self.kind.status_nibble() << 4 | self.channel.as_int()
    }

    /// Either 2 or 3 bytes, depending on whether the kind carries a second data byte.
    #[inline]
    pub fn wire_length(&self) -> u32 {
        if self.kind.has_data2() {
            3
        } else {
            2
        }
    }

    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let bytes = [self.status(), self.data1.as_int(), self.data2.as_int()];
        write_bytes(out, &bytes[..self.wire_length() as usize])
    }

    fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(ChannelMessage, usize)> {
        let status = read_u8(src)?;
        let kind = MessageKind::from_status(status).ok_or(ErrorKind::UnknownEventType(status))?;
        let data1 = u7::read(src)?;
        let data2 = if kind.has_data2() {
            u7::read(src)?
        } else {
            u7::new(0)
        };
        let msg = ChannelMessage {
            kind,
            channel: u4::new(status & 0x0F),
            data1,
            data2,
        };
        Ok((msg, msg.wire_length() as usize))
    }
}

/// The type byte of a meta event.
///
/// Two meta types are equal if they have the same type byte, so `Unknown(0x2F)` is the same as
/// `EndOfTrack`.
#[derive(Copy, Clone, Debug)]
pub enum MetaType {
    /// `0x00`: a 16-bit sequence number, or empty to use the track position.
    SequenceNumber,
    /// `0x01`: arbitrary text.
    Text,
    /// `0x02`: a copyright notice.
    Copyright,
    /// `0x03`: the name of the sequence or track.
    TrackName,
    /// `0x04`: the instrument used in this track.
    InstrumentName,
    /// `0x05`: a lyric, usually a single syllable.
    Lyric,
    /// `0x06`: a rehearsal letter or section name.
    Marker,
    /// `0x07`: a description of something happening on stage.
    Cue,
    /// `0x08`: the name of the program (patch) in use.
    ProgramName,
    /// `0x09`: the name of the device this track is intended for.
    DeviceName,
    /// `0x20`: the MIDI channel associated with the following meta and sysex events.
    ChannelPrefix,
    /// `0x21`: the MIDI port this track is intended for.
    MidiPort,
    /// `0x2F`: the mandatory last event of every track.
    EndOfTrack,
    /// `0x51`: microseconds per quarter note, as a 24-bit big-endian integer.
    Tempo,
    /// `0x54`: the SMPTE time at which the track should start.
    SmpteOffset,
    /// `0x58`: numerator, denominator (as a power of two), clocks per click and 32nd notes per
    /// quarter note.
    TimeSignature,
    /// `0x59`: amount of sharps (negative for flats) and whether the key is minor.
    KeySignature,
    /// `0x7F`: data for a specific sequencer, starting with a manufacturer id.
    SequencerSpecific,
    /// Any other type byte.
    ///
    /// Kept so that files with non-standard meta events survive a round trip unchanged.
    /// `MetaEvent::new` turns known type bytes into their named variant.
    Unknown(u8),
}
impl MetaType {
    pub fn from_byte(byte: u8) -> MetaType {
        use self::MetaType::*;
        match byte {
            0x00 => SequenceNumber,
            0x01 => Text,
            0x02 => Copyright,
            0x03 => TrackName,
            0x04 => InstrumentName,
            0x05 => Lyric,
            0x06 => Marker,
            0x07 => Cue,
            0x08 => ProgramName,
            0x09 => DeviceName,
            0x20 => ChannelPrefix,
            0x21 => MidiPort,
            0x2F => EndOfTrack,
            0x51 => Tempo,
            0x54 => SmpteOffset,
            0x58 => TimeSignature,
            0x59 => KeySignature,
            0x7F => SequencerSpecific,
            other => Unknown(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        use self::MetaType::*;
        match self {
            SequenceNumber => 0x00,
            Text => 0x01,
            Copyright => 0x02,
            TrackName => 0x03,
            InstrumentName => 0x04,
            Lyric => 0x05,
            Marker => 0x06,
            Cue => 0x07,
            ProgramName => 0x08,
            DeviceName => 0x09,
            ChannelPrefix => 0x20,
            MidiPort => 0x21,
            EndOfTrack => 0x2F,
            Tempo => 0x51,
            SmpteOffset => 0x54,
            TimeSignature => 0x58,
            KeySignature => 0x59,
            SequencerSpecific => 0x7F,
            Unknown(byte) => byte,
        }
    }

    /// Whether the data of this meta type is meant to be read as text.
    #[inline]
    pub fn is_text(self) -> bool {
        (0x01..=0x09).contains(&self.as_byte())
    }
}
impl PartialEq for MetaType {
    #[inline]
    fn eq(&self, other: &MetaType) -> bool {
        self.as_byte() == other.as_byte()
    }
}
impl Eq for MetaType {}
impl Hash for MetaType {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_byte().hash(state)
    }
}

/// A meta event: `0xFF`, a type byte, the data length as a variable-length integer, and the
/// data itself.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct MetaEvent {
    pub meta_type: MetaType,
    pub data: Vec<u8>,
}
impl MetaEvent {
    /// Create a meta event, normalizing `MetaType::Unknown` with a known type byte into its
    /// named variant.
    #[inline]
    pub fn new(meta_type: MetaType, data: Vec<u8>) -> MetaEvent {
        MetaEvent {
            meta_type: MetaType::from_byte(meta_type.as_byte()),
            data,
        }
    }

    /// The event that must close every track.
    #[inline]
    pub fn end_of_track() -> MetaEvent {
        MetaEvent::new(MetaType::EndOfTrack, Vec::new())
    }

    /// Set the tempo, in microseconds per quarter note.
    ///
    /// Only 24 bits fit in a tempo event, larger values are clamped.
    pub fn tempo(micros_per_quarter: u32) -> MetaEvent {
        let micros = micros_per_quarter.min(0xFF_FFFF);
        MetaEvent::new(MetaType::Tempo, micros.to_be_bytes()[1..].to_vec())
    }

    /// A text-like meta event, such as a track name or a lyric.
    #[inline]
    pub fn text(meta_type: MetaType, text: &str) -> MetaEvent {
        MetaEvent::new(meta_type, text.as_bytes().to_vec())
    }

    /// A time signature of `numerator / 2^denominator_pow2`.
    pub fn time_signature(
        numerator: u8,
        denominator_pow2: u8,
        clocks_per_click: u8,
        notated_32nds_per_quarter: u8,
    ) -> MetaEvent {
        MetaEvent::new(
            MetaType::TimeSignature,
            vec![
                numerator,
                denominator_pow2,
                clocks_per_click,
                notated_32nds_per_quarter,
            ],
        )
    }

    /// A key signature with `sharps` sharps (negative for flats).
    #[inline]
    pub fn key_signature(sharps: i8, minor: bool) -> MetaEvent {
        MetaEvent::new(MetaType::KeySignature, vec![sharps as u8, minor as u8])
    }

    /// The tempo in microseconds per quarter note, if this is a well-formed tempo event.
    pub fn as_tempo(&self) -> Option<u32> {
        if self.meta_type != MetaType::Tempo {
            return None;
        }
        match self.data[..] {
            [a, b, c, ..] => Some(u32::from_be_bytes([0, a, b, c])),
            _ => None,
        }
    }

    /// The data as UTF-8 text, if this is a text-like event holding valid UTF-8.
    pub fn as_text(&self) -> Option<&str> {
        if self.meta_type.is_text() {
            std::str::from_utf8(&self.data).ok()
        } else {
            None
        }
    }

    /// `0xFF` and the type byte, the variable-length data length, and the data.
    pub fn wire_length(&self) -> u32 {
        let len = u32::try_from(self.data.len()).unwrap_or(u32::MAX);
        (2 + vlq::encoded_len(len) as u32).saturating_add(len)
    }

    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        write_bytes(out, &[META_STATUS, self.meta_type.as_byte()])?;
        vlq::write_slice(out, &self.data)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(MetaEvent, usize)> {
        let _status = read_u8(src)?;
        let meta_type = MetaType::from_byte(read_u8(src)?);
        let (data, data_len) = vlq::read_slice(src)?;
        Ok((MetaEvent { meta_type, data }, 2 + data_len))
    }
}

/// A system exclusive event: `0xF0`, the manufacturer id, the data, and a terminating `0xF7`.
///
/// Since the end of the event is found by scanning for the terminator, the data itself cannot
/// contain a `0xF7` byte.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct SysEx {
    pub manufacturer_id: u8,
    pub data: Vec<u8>,
}
impl SysEx {
    #[inline]
    pub fn new(manufacturer_id: u8, data: Vec<u8>) -> SysEx {
        SysEx {
            manufacturer_id,
            data,
        }
    }

    pub fn wire_length(&self) -> u32 {
        let len = u32::try_from(self.data.len()).unwrap_or(u32::MAX);
        3u32.saturating_add(len)
    }

    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        ensure!(
            !self.data.contains(&SYSEX_END),
            ErrorKind::InvalidInput("sysex data contains the 0xF7 terminator")
        );
        write_bytes(out, &[SYSEX_STATUS, self.manufacturer_id])?;
        write_bytes(out, &self.data)?;
        write_u8(out, SYSEX_END)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(src: &mut R) -> Result<(SysEx, usize)> {
        let _status = read_u8(src)?;
        let manufacturer_id = read_u8(src)?;
        let mut data = Vec::new();
        loop {
            match read_u8(src).context("unterminated sysex event")? {
                SYSEX_END => break,
                byte => data.push(byte),
            }
        }
        let len = 3 + data.len();
        Ok((
            SysEx {
                manufacturer_id,
                data,
            },
            len,
        ))
    }
}
