use pretty_assertions::assert_eq;
use smfcodec::{
    io::{IoRead, IoWrap},
    num::{u4, u7},
    ChannelMessage, ErrorKind, EventKind, Format, Header, MessageKind, MetaEvent, MetaType, Smf,
    SysEx, Track, TrackEvent,
};

/// A small but complete song: a tempo track and a melody track.
fn song() -> Smf {
    let mut smf = Smf::new(Header::new(Format::MultiTrackSync, 480));

    let mut tempo = Track::new();
    tempo.push(TrackEvent::new(0, MetaEvent::text(MetaType::TrackName, "Tempo")));
    tempo.push(TrackEvent::new(0, MetaEvent::time_signature(4, 2, 24, 8)));
    tempo.push(TrackEvent::new(0, MetaEvent::tempo(500_000)));
    tempo.terminate();
    smf.add_track(tempo).unwrap();

    let mut melody = Track::new();
    melody.push(TrackEvent::new(0, MetaEvent::text(MetaType::TrackName, "Melody")));
    melody.push(TrackEvent::new(0, ChannelMessage::program_change(0, 73)));
    melody.push(TrackEvent::new(0, SysEx::new(0x7E, vec![0x7F, 0x09, 0x01])));
    for (i, &key) in [60u8, 62, 64, 65, 67].iter().enumerate() {
        melody.push(TrackEvent::new(
            if i == 0 { 0 } else { 240 },
            ChannelMessage::note_on(0, key, 90),
        ));
        melody.push(TrackEvent::new(240, ChannelMessage::note_off(0, key, 0)));
    }
    melody.push(TrackEvent::new(0, ChannelMessage::pitch_bend(0, 0x2400)));
    melody.terminate();
    smf.add_track(melody).unwrap();

    smf
}

#[test]
fn note_on_note_off_round_trip() {
    let mut smf = Smf::new(Header::new(Format::MultiTrackSync, 96));
    let mut track = Track::new();
    track.push(TrackEvent::new(0, ChannelMessage::note_on(0, 60, 100)));
    track.push(TrackEvent::new(128, ChannelMessage::note_off(0, 60, 0)));
    smf.add_track(track).unwrap();

    let raw = smf.to_bytes().unwrap();
    let decoded = Smf::from_bytes(&raw).unwrap();

    assert_eq!(decoded.header.format, Format::MultiTrackSync);
    assert_eq!(decoded.track_count(), 1);
    let events = &decoded.tracks()[0].events;
    assert_eq!(events.len(), 2);

    assert_eq!(events[0].delta, 0);
    match &events[0].kind {
        EventKind::Channel(msg) => {
            assert_eq!(msg.kind(), MessageKind::NoteOn);
            assert_eq!(msg.channel(), u4::new(0));
            assert_eq!(msg.data1(), u7::new(60));
            assert_eq!(msg.data2(), u7::new(100));
        }
        other => panic!("expected a note on, got {:?}", other),
    }

    assert_eq!(events[1].delta, 128);
    match &events[1].kind {
        EventKind::Channel(msg) => {
            assert_eq!(msg.kind(), MessageKind::NoteOff);
            assert_eq!(msg.channel(), u4::new(0));
            assert_eq!(msg.data1(), u7::new(60));
            assert_eq!(msg.data2(), u7::new(0));
        }
        other => panic!("expected a note off, got {:?}", other),
    }
}

#[test]
fn track_declared_one_byte_short() {
    let mut smf = Smf::default();
    let mut track = Track::new();
    track.push(TrackEvent::new(0, ChannelMessage::note_on(0, 60, 100)));
    track.push(TrackEvent::new(128, ChannelMessage::note_off(0, 60, 0)));
    track.terminate();
    smf.add_track(track).unwrap();
    let mut raw = smf.to_bytes().unwrap();

    //Header chunk is 14 bytes, the track length field follows the track magic
    let len_field = 14 + 4;
    let declared = u32::from_be_bytes([
        raw[len_field],
        raw[len_field + 1],
        raw[len_field + 2],
        raw[len_field + 3],
    ]);
    raw[len_field..len_field + 4].copy_from_slice(&(declared - 1).to_be_bytes());

    let err = Smf::from_bytes(&raw).unwrap_err();
    assert!(
        matches!(err.kind(), ErrorKind::TruncatedData(_)),
        "unexpected error: {:?}",
        err
    );
    assert!(err.is_truncated());
}

#[test]
fn wrong_header_magic() {
    let mut raw = song().to_bytes().unwrap();
    raw[..4].copy_from_slice(b"XThd");
    let err = Smf::from_bytes(&raw).unwrap_err();
    assert!(err.is_format());
    assert_eq!(err.kind(), ErrorKind::Format("bad header magic"));
}

#[test]
fn end_of_track_encoding() {
    let mut raw = Vec::<u8>::new();
    TrackEvent::new(0, MetaEvent::end_of_track())
        .encode(&mut raw)
        .unwrap();
    assert_eq!(raw, vec![0x00, 0xFF, 0x2F, 0x00]);

    raw.clear();
    TrackEvent::new(300, MetaEvent::end_of_track())
        .encode(&mut raw)
        .unwrap();
    assert_eq!(raw, vec![0x82, 0x2C, 0xFF, 0x2F, 0x00]);
}

#[test]
fn song_round_trip() {
    let smf = song();
    let raw = smf.to_bytes().unwrap();
    let decoded = Smf::from_bytes(&raw).unwrap();
    assert_eq!(decoded, smf);
    assert_eq!(decoded.to_bytes().unwrap(), raw);

    let tempo = &decoded.tracks()[0];
    assert!(tempo.ends_with_end_of_track());
    let names: Vec<&str> = decoded
        .tracks()
        .iter()
        .filter_map(|track| match &track.events[0].kind {
            EventKind::Meta(meta) => meta.as_text(),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["Tempo", "Melody"]);
}

#[test]
fn std_io_round_trip() {
    let smf = song();
    let mut sink = IoWrap(Vec::<u8>::new());
    smf.encode(&mut sink).unwrap();
    let raw = sink.0;

    let mut source = IoRead(std::io::BufReader::new(&raw[..]));
    let decoded = Smf::decode(&mut source).unwrap();
    assert_eq!(decoded, smf);
}

#[test]
fn many_tracks() {
    let mut smf = Smf::with_max_tracks(Header::default(), 64);
    for channel in 0..64u32 {
        let mut track = Track::new();
        for step in 0..50 {
            let key = (36 + step % 48) as u8;
            track.push(TrackEvent::new(
                step,
                ChannelMessage::note_on((channel % 16) as u8, key, 64),
            ));
            track.push(TrackEvent::new(
                step * 3,
                ChannelMessage::note_off((channel % 16) as u8, key, 64),
            ));
        }
        track.terminate();
        smf.add_track(track).unwrap();
    }
    let raw = smf.to_bytes().unwrap();

    let err = Smf::from_bytes(&raw).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::LimitExceeded(_)));

    let decoded = Smf::decode_with_max_tracks(&mut &raw[..], 64).unwrap();
    assert_eq!(decoded, smf);
}
