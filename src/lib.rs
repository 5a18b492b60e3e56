//! # Overview
//!
//! `smfcodec` turns an in-memory Standard Midi File (SMF) into its exact byte representation,
//! and back.
//!
//! Usage is as simple as:
//!
//! ```rust
//! use smfcodec::{ChannelMessage, Smf, Track, TrackEvent};
//!
//! let mut track = Track::new();
//! track.push(TrackEvent::new(0, ChannelMessage::note_on(0, 60, 100)));
//! track.push(TrackEvent::new(128, ChannelMessage::note_off(0, 60, 0)));
//!
//! let mut smf = Smf::default();
//! smf.add_track(track).unwrap();
//!
//! let bytes = smf.to_bytes().unwrap();
//! let decoded = Smf::from_bytes(&bytes).unwrap();
//! assert_eq!(smf, decoded);
//! ```
//!
//! The [`Smf`](struct.Smf.html) struct is the main type in the crate.
//! It owns a [`Header`](struct.Header.html) and a list of [`Track`](struct.Track.html)s, each of
//! which owns its [`TrackEvent`](struct.TrackEvent.html)s.
//!
//! # Sinks and sources
//!
//! The codec never opens or closes files.
//! Encoding writes into any [`io::Write`](io/trait.Write.html) sink and decoding reads from any
//! [`io::Read`](io/trait.Read.html) source.
//! Byte slices and `Vec<u8>` work out of the box, and `std::io` streams can be wrapped with
//! [`io::IoWrap`](io/struct.IoWrap.html) and [`io::IoRead`](io/struct.IoRead.html):
//!
//! ```rust
//! # use smfcodec::Smf;
//! # let smf = Smf::default();
//! let mut in_memory = Vec::new();
//! smf.encode(&mut in_memory).unwrap();
//!
//! let mut source = &in_memory[..];
//! let decoded = Smf::decode(&mut source).unwrap();
//! # assert_eq!(smf, decoded);
//! ```
//!
//! # About features
//!
//! - The `parallel` feature (enabled by default)
//!
//!   Tracks are independent once the header has been read, so large files are decoded and
//!   encoded on several threads through the `rayon` dependency.
//!   Tracks are always consumed and emitted in their original order.
//!
//! - The `strict` feature
//!
//!   By default `smfcodec` accepts a few recoverable deviations from the standard: header
//!   chunks longer than 6 bytes are skipped over, and `Format::SingleTrack` files may declare
//!   any amount of tracks.
//!   With `strict` enabled these are rejected with an `ErrorKind::Format` error.
//!
//!   Corrupted event data, such as a channel message data byte with its top bit set, is always
//!   rejected.
//!
//! # Logging
//!
//! Decode and encode summaries are emitted through the `tracing` facade.
//! No subscriber is installed by this crate.

macro_rules! bail {
    ($err:expr) => {{
        return Err($err.into());
    }};
}
macro_rules! ensure {
    ($cond:expr, $err:expr) => {{
        if !$cond {
            bail!($err)
        }
    }};
}

/// All of the errors this crate produces.
mod error;

mod prelude {
    pub(crate) use crate::{
        error::{Error, ErrorKind, Result, ResultExt},
        io::{Read, Write},
        primitive::{u4, u7},
    };
    pub(crate) use std::{convert::TryFrom, fmt, io as stdio};
}

mod event;
pub mod io;
mod primitive;
mod smf;
pub mod vlq;

pub use crate::{
    error::{Error, ErrorKind, Result},
    event::{ChannelMessage, EventKind, MessageKind, MetaEvent, MetaType, SysEx, TrackEvent},
    primitive::Format,
    smf::{Header, Smf, Track, DEFAULT_MAX_TRACKS},
};

/// Exotically-sized integers used by the MIDI standard.
pub mod num {
    pub use crate::primitive::{u4, u7};
}
