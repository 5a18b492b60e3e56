//! Specific to the SMF packaging of MIDI streams.

use crate::{
    event::{EventKind, MetaEvent, TrackEvent},
    io::{IoRead, IoWrap},
    prelude::*,
    primitive::{read_bytes, read_magic, read_u16, read_u32, write_bytes, write_u16, write_u32},
    Format,
};
use tracing::{debug, trace, warn};

/// The maximum amount of tracks a file may hold, unless configured otherwise through
/// [`Smf::with_max_tracks`](struct.Smf.html#method.with_max_tracks).
///
/// The header field itself could hold up to 65535 tracks.
pub const DEFAULT_MAX_TRACKS: usize = 16;

/// How many bytes must a MIDI body have in order to enable multithreading.
///
/// When writing, the MIDI body size is computed from the event lengths.
#[cfg(feature = "parallel")]
const PARALLEL_ENABLE_THRESHOLD: usize = 3 * 1024;

/// How many events per byte to estimate when allocating memory for events while decoding.
///
/// Without running status a channel message takes up 4 bytes including its delta-time, and these
/// make up the bulk of most MIDI files.
const BYTES_TO_EVENTS: f32 = 1.0 / 4.0;

const HEADER_MAGIC: &[u8; 4] = b"MThd";
const TRACK_MAGIC: &[u8; 4] = b"MTrk";
/// The length of the header chunk body: format, track count and ticks per quarter note.
const HEADER_LEN: u32 = 6;

/// A MIDI file header, indicating metadata about the file.
///
/// The track count is not stored here: it is always the amount of tracks in the
/// [`Smf`](struct.Smf.html), so that the two can never disagree.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Header {
    /// Information about how should the tracks be laid out when playing them back.
    pub format: Format,
    /// The raw time division field, in ticks per quarter note.
    ///
    /// If the top bit is set the field holds SMPTE timing instead; it is kept unchanged either
    /// way.
    pub ticks_per_quarter_note: u16,
}
impl Header {
    /// Create a new header from its raw parts.
    #[inline]
    pub fn new(format: Format, ticks_per_quarter_note: u16) -> Header {
        Header {
            format,
            ticks_per_quarter_note,
        }
    }

    /// Read a whole header chunk, yielding the `Header` and the declared track count.
    fn read<R: Read + ?Sized>(src: &mut R) -> Result<(Header, u16)> {
        let magic = read_magic(src).context("failed to read header magic")?;
        ensure!(&magic == HEADER_MAGIC, ErrorKind::Format("bad header magic"));
        let len = read_u32(src).context("failed to read header length")?;
        if len != HEADER_LEN {
            warn!(len, "midi header chunk length is not {}", HEADER_LEN);
            ensure!(
                !cfg!(feature = "strict"),
                ErrorKind::Format("header chunk length is not 6")
            );
            ensure!(len > HEADER_LEN, ErrorKind::Format("header chunk too short"));
        }
        //Consume the whole chunk and only interpret the fields we know about
        let raw = read_bytes(src, len as usize).context("failed to read header chunk")?;
        let mut raw = &raw[..];
        let format = Format::from_bits(read_u16(&mut raw)?)?;
        let track_count = read_u16(&mut raw)?;
        let ticks_per_quarter_note = read_u16(&mut raw)?;
        Ok((Header::new(format, ticks_per_quarter_note), track_count))
    }

    /// Write a whole header chunk.
    fn write<W: Write + ?Sized>(&self, track_count: u16, out: &mut W) -> Result<()> {
        write_bytes(out, HEADER_MAGIC)?;
        write_u32(out, HEADER_LEN)?;
        write_u16(out, self.format.as_bits())?;
        write_u16(out, track_count)?;
        write_u16(out, self.ticks_per_quarter_note)?;
        Ok(())
    }
}
impl Default for Header {
    /// A `MultiTrackSync` header with 64 ticks per quarter note.
    #[inline]
    fn default() -> Header {
        Header::new(Format::MultiTrackSync, 64)
    }
}

/// A single track: simply a list of track events, in temporal order.
#[derive(Clone, PartialEq, Eq, Debug, Hash, Default)]
pub struct Track {
    pub events: Vec<TrackEvent>,
}
impl Track {
    #[inline]
    pub fn new() -> Track {
        Track { events: Vec::new() }
    }

    #[inline]
    pub fn with_events(events: Vec<TrackEvent>) -> Track {
        Track { events }
    }

    /// Append an event at the end of the track.
    #[inline]
    pub fn push(&mut self, event: TrackEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<TrackEvent> {
        self.events.iter()
    }

    /// The amount of bytes the events take up in the track chunk, delta-times included.
    ///
    /// This is the value written in the chunk length field.
    pub fn payload_length(&self) -> u64 {
        self.events.iter().map(TrackEvent::encoded_len).sum()
    }

    /// Whether the last event is the `EndOfTrack` meta event every track should end with.
    #[inline]
    pub fn ends_with_end_of_track(&self) -> bool {
        self.events
            .last()
            .map_or(false, |ev| ev.kind.is_end_of_track())
    }

    /// Append an `EndOfTrack` meta event right after the last event, unless there already is
    /// one.
    pub fn terminate(&mut self) {
        if !self.ends_with_end_of_track() {
            self.push(TrackEvent::new(0, EventKind::Meta(MetaEvent::end_of_track())));
        }
    }

    /// Write a whole track chunk.
    ///
    /// The chunk length is computed up front from the event lengths, so the events are encoded
    /// only once, straight into the sink.
    pub fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        let len = u32::try_from(self.payload_length())
            .map_err(|_| ErrorKind::InvalidInput("midi chunk size exceeds 32 bit range"))?;
        write_bytes(out, TRACK_MAGIC)?;
        write_u32(out, len)?;
        for ev in self.events.iter() {
            ev.encode(out)?;
        }
        Ok(())
    }

    /// Read a whole track chunk.
    ///
    /// The events must take up exactly the length declared by the chunk.
    pub fn decode<R: Read + ?Sized>(src: &mut R) -> Result<Track> {
        let payload = read_track_chunk(src)?;
        Track::decode_payload(&payload)
    }

    /// Decode the events in the body of a track chunk.
    ///
    /// The declared chunk length is the budget for the events: an event that does not fit in it
    /// is a `TruncatedData` error, not an event cut short.
    fn decode_payload(payload: &[u8]) -> Result<Track> {
        let mut events = Vec::with_capacity((payload.len() as f32 * BYTES_TO_EVENTS) as usize);
        let mut raw = payload;
        let mut remaining = payload.len();
        while remaining > 0 {
            let (ev, consumed) = TrackEvent::decode(&mut raw)
                .map_err(|err| match err.kind() {
                    ErrorKind::TruncatedInput(_) => err.with_kind(ErrorKind::TruncatedData(
                        "event exceeds the declared track length",
                    )),
                    _ => err,
                })
                .context("failed to decode track")?;
            remaining = remaining.checked_sub(consumed).ok_or(ErrorKind::TruncatedData(
                "event exceeds the declared track length",
            ))?;
            events.push(ev);
        }
        Ok(Track::with_events(events))
    }
}
impl IntoIterator for Track {
    type IntoIter = std::vec::IntoIter<TrackEvent>;
    type Item = TrackEvent;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}
impl<'a> IntoIterator for &'a Track {
    type IntoIter = std::slice::Iter<'a, TrackEvent>;
    type Item = &'a TrackEvent;
    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}
impl From<Vec<TrackEvent>> for Track {
    #[inline]
    fn from(events: Vec<TrackEvent>) -> Track {
        Track::with_events(events)
    }
}

/// Read the magic and length of a track chunk, and then its raw body.
fn read_track_chunk<R: Read + ?Sized>(src: &mut R) -> Result<Vec<u8>> {
    let magic = read_magic(src).context("failed to read track magic")?;
    ensure!(&magic == TRACK_MAGIC, ErrorKind::Format("bad track magic"));
    let len = read_u32(src).context("failed to read track length")?;
    read_bytes(src, len as usize).context("reached eof before track chunk ended")
}

/// Represents a single `.mid` Standard Midi File.
/// If you're casually looking to encode or decode a `.mid` file, this is the type you're looking
/// for.
///
/// The file exclusively owns its tracks, which can only be appended through
/// [`add_track`](#method.add_track) so that the track limit is always respected.
#[derive(Clone, Debug)]
pub struct Smf {
    /// The header of this MIDI file, indicating timing information and track format.
    pub header: Header,
    tracks: Vec<Track>,
    max_tracks: usize,
}
impl Smf {
    /// Create a new empty `Smf` with zero tracks, using the given header.
    #[inline]
    pub fn new(header: Header) -> Smf {
        Smf::with_max_tracks(header, DEFAULT_MAX_TRACKS)
    }

    /// Create a new empty `Smf` that accepts up to `max_tracks` tracks instead of
    /// [`DEFAULT_MAX_TRACKS`](constant.DEFAULT_MAX_TRACKS.html).
    ///
    /// The limit is capped at 65535, the most the header can declare.
    #[inline]
    pub fn with_max_tracks(header: Header, max_tracks: usize) -> Smf {
        Smf {
            header,
            tracks: Vec::new(),
            max_tracks: max_tracks.min(u16::MAX as usize),
        }
    }

    #[inline]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Mutable access to the existing tracks.
    ///
    /// Tracks can be modified, but not added or removed through this slice.
    #[inline]
    pub fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    #[inline]
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    #[inline]
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn max_tracks(&self) -> usize {
        self.max_tracks
    }

    /// Change the maximum amount of tracks.
    ///
    /// Fails with `ErrorKind::LimitExceeded` if the file already holds more tracks than that.
    pub fn set_max_tracks(&mut self, max_tracks: usize) -> Result<()> {
        let max_tracks = max_tracks.min(u16::MAX as usize);
        ensure!(
            self.tracks.len() <= max_tracks,
            ErrorKind::LimitExceeded("file already holds more tracks than the new limit")
        );
        self.max_tracks = max_tracks;
        Ok(())
    }

    /// Append a track at the end of the file.
    ///
    /// Fails with `ErrorKind::LimitExceeded` if the file is already full, leaving it unchanged.
    pub fn add_track(&mut self, track: Track) -> Result<()> {
        ensure!(
            self.tracks.len() < self.max_tracks,
            ErrorKind::LimitExceeded("too many tracks")
        );
        self.tracks.push(track);
        Ok(())
    }

    /// Decode a whole file, accepting up to
    /// [`DEFAULT_MAX_TRACKS`](constant.DEFAULT_MAX_TRACKS.html) tracks.
    #[inline]
    pub fn decode<R: Read + ?Sized>(src: &mut R) -> Result<Smf> {
        Smf::decode_with_max_tracks(src, DEFAULT_MAX_TRACKS)
    }

    /// Decode a whole file, accepting up to `max_tracks` tracks.
    ///
    /// The header is read first, and then exactly as many track chunks as it declares, in order.
    /// Any failure aborts the whole decode: no partial file is ever returned.
    /// If several tracks are broken, the error reported is always the one from the earliest
    /// track, even when the tracks are decoded in parallel.
    /// Bytes after the last declared track are left unread in the source.
    pub fn decode_with_max_tracks<R: Read + ?Sized>(src: &mut R, max_tracks: usize) -> Result<Smf> {
        let (header, track_count) = Header::read(src).context("invalid midi header")?;
        let mut smf = Smf::with_max_tracks(header, max_tracks);
        ensure!(
            track_count as usize <= smf.max_tracks,
            ErrorKind::LimitExceeded("file declares too many tracks")
        );
        if cfg!(feature = "strict") {
            ensure!(
                header.format != Format::SingleTrack || track_count == 1,
                ErrorKind::Format("singletrack format file does not have exactly one track")
            );
        }
        debug!(
            format = ?header.format,
            track_count,
            ticks_per_quarter_note = header.ticks_per_quarter_note,
            "decoding midi file"
        );

        //Each track is decoded as soon as its chunk is read
        #[cfg(not(feature = "parallel"))]
        {
            smf.tracks.reserve(track_count as usize);
            for idx in 0..track_count as usize {
                let payload = read_track_chunk(src).context("failed to read track chunk")?;
                smf.tracks.push(decode_track(idx, &payload)?);
            }
        }

        //Chunks are read up front so that their events can be decoded in parallel
        #[cfg(feature = "parallel")]
        {
            let mut payloads = Vec::with_capacity(track_count as usize);
            for _ in 0..track_count {
                match read_track_chunk(src).context("failed to read track chunk") {
                    Ok(payload) => payloads.push(payload),
                    Err(err) => {
                        //Events in the tracks before an unreadable chunk fail first
                        decode_tracks(&payloads)?;
                        return Err(err);
                    }
                }
            }
            smf.tracks = decode_tracks(&payloads)?;
        }
        Ok(smf)
    }

    /// Encode and write the whole file into the given sink.
    ///
    /// The header is always written first, and tracks are written in order.
    ///
    /// A file without tracks is allowed, and encodes to a lone header chunk declaring zero
    /// tracks, which decodes back to an empty file.
    ///
    /// # Errors
    ///
    /// Besides bubbling up errors from the sink, an `ErrorKind::InvalidInput` error is raised if
    /// a single track is 4GB or larger, or if a SysEx event contains its own terminator.
    pub fn encode<W: Write + ?Sized>(&self, out: &mut W) -> Result<()> {
        ensure!(
            self.tracks.len() <= self.max_tracks,
            ErrorKind::LimitExceeded("too many tracks")
        );
        let track_count = u16::try_from(self.tracks.len())
            .map_err(|_| ErrorKind::InvalidInput("track count exceeds 16 bit range"))?;
        self.header.write(track_count, out)?;

        //Try to write the file in parallel
        #[cfg(feature = "parallel")]
        {
            let body_len = self
                .tracks
                .iter()
                .map(|track| 8 + track.payload_length())
                .sum::<u64>();
            if body_len >= PARALLEL_ENABLE_THRESHOLD as u64 {
                use rayon::prelude::*;

                debug!(body_len, track_count, "encoding midi file in parallel");
                //Write out the tracks in parallel into several different buffers
                let mut track_chunks = Vec::new();
                self.tracks
                    .par_iter()
                    .map(|track| -> Result<Vec<u8>> {
                        let mut track_chunk = Vec::new();
                        track.encode(&mut track_chunk)?;
                        Ok(track_chunk)
                    })
                    .collect_into_vec(&mut track_chunks);

                //Write down the tracks sequentially and in order
                for result in track_chunks {
                    let track_chunk: Vec<u8> = result.context("failed to write track")?;
                    out.write(&track_chunk)?;
                }
                return Ok(());
            }
        }

        debug!(track_count, "encoding midi file");
        for track in self.tracks.iter() {
            track.encode(out).context("failed to write track")?;
        }
        Ok(())
    }

    /// Encode the file into a new in-memory buffer.
    #[inline]
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }

    /// Decode a file held in memory.
    #[inline]
    pub fn from_bytes(mut raw: &[u8]) -> Result<Smf> {
        Smf::decode(&mut raw)
    }

    /// Encode and write the file to the given `std::io::Write` stream.
    ///
    /// Similar to [`encode`](#method.encode), but takes a standard stream instead of a
    /// `smfcodec::io::Write` sink.
    #[inline]
    pub fn write_std<W: stdio::Write>(&self, out: W) -> Result<()> {
        self.encode(&mut IoWrap(out))
    }

    /// Decode a file from the given `std::io::BufRead` stream.
    ///
    /// Similar to [`decode`](#method.decode), but takes a standard stream instead of a
    /// `smfcodec::io::Read` source.
    #[inline]
    pub fn read_std<R: stdio::BufRead>(src: R) -> Result<Smf> {
        Smf::decode(&mut IoRead(src))
    }
}
impl Default for Smf {
    #[inline]
    fn default() -> Smf {
        Smf::new(Header::default())
    }
}
impl PartialEq for Smf {
    /// Two files are equal if they encode to the same bytes, regardless of their track limits.
    fn eq(&self, other: &Smf) -> bool {
        self.header == other.header && self.tracks == other.tracks
    }
}
impl Eq for Smf {}

/// Decode the body of a single track chunk.
fn decode_track(idx: usize, payload: &[u8]) -> Result<Track> {
    let track = Track::decode_payload(payload).context("failed to decode track chunk")?;
    trace!(idx, events = track.len(), "decoded track");
    Ok(track)
}

/// Decode the bodies of several track chunks, in parallel if they are large enough.
///
/// Results are kept in wire order, so the error reported is the one from the earliest track
/// that failed.
#[cfg(feature = "parallel")]
fn decode_tracks(payloads: &[Vec<u8>]) -> Result<Vec<Track>> {
    let mut results = Vec::with_capacity(payloads.len());

    //Attempt to use multiple threads if advantageous
    let body_len = payloads.iter().map(Vec::len).sum::<usize>();
    if body_len >= PARALLEL_ENABLE_THRESHOLD {
        use rayon::prelude::*;

        debug!(body_len, tracks = payloads.len(), "decoding tracks in parallel");
        payloads
            .par_iter()
            .enumerate()
            .map(|(idx, payload)| decode_track(idx, payload))
            .collect_into_vec(&mut results);
    } else {
        for (idx, payload) in payloads.iter().enumerate() {
            results.push(decode_track(idx, payload));
        }
    }

    results.into_iter().collect()
}
