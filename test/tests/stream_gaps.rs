/// Stream data that does not connect keeps its gap on every end: sequential
/// readers are told about it, time-indexed readers find no data inside it

use tandem_shared::{
    ChannelConfig, EntryOptions, ReadMode, ReadOptions, ReadOutcome, ReadToken, Retention,
    TimeAspect, TimeSpec, MAX_TIMETICK,
};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Position};

#[derive(Debug, PartialEq)]
enum Seen {
    At(i32, TimeSpec),
    Gap(TimeSpec),
}

fn drain(reader: &mut ReadToken) -> Vec<Seen> {
    let mut seen = Vec::new();
    loop {
        match reader.read(MAX_TIMETICK) {
            ReadOutcome::Data(access) => {
                let position = access.get::<Position>().expect("position record");
                seen.push(Seen::At(position.x, access.time()));
            }
            ReadOutcome::Gap(time) => seen.push(Seen::Gap(time)),
            ReadOutcome::NoData => return seen,
        }
    }
}

#[test]
fn gap_survives_the_transport() {
    init_logging();
    let config = ChannelConfig {
        name: "track".to_string(),
        retention: Retention { span: 0, depth: 8 },
        ..ChannelConfig::default()
    };
    let network = ChannelNetwork::new(config, record_kinds(), 1);

    let mut writer = network
        .end(1)
        .add_write_token::<Position>(EntryOptions {
            time_aspect: TimeAspect::Stream,
            ..EntryOptions::default()
        })
        .unwrap();
    network.settle(8);

    let mut sequential = network
        .master()
        .add_read_token::<Position>(ReadOptions {
            mode: ReadMode::Sequential,
            ..ReadOptions::default()
        })
        .unwrap();
    let mut indexed = network
        .master()
        .add_read_token::<Position>(ReadOptions::default())
        .unwrap();
    assert_eq!(sequential.attached_entries(), vec![0]);

    writer.write(Position::new(1, 0), TimeSpec::span(0, 10)).unwrap();
    writer.write(Position::new(2, 0), TimeSpec::span(10, 20)).unwrap();
    writer.write(Position::new(3, 0), TimeSpec::span(35, 40)).unwrap();
    // the local gap is packed as a time jump between the second and third record
    assert_eq!(network.broadcast_data(1).unwrap(), vec![4]);

    assert_eq!(
        drain(&mut sequential),
        vec![
            Seen::At(1, TimeSpec::span(0, 10)),
            Seen::At(2, TimeSpec::span(10, 20)),
            Seen::Gap(TimeSpec::span(20, 35)),
            Seen::At(3, TimeSpec::span(35, 40)),
        ]
    );

    let x_at = |reader: &mut ReadToken, tick| match reader.read(tick) {
        ReadOutcome::Data(access) => access.get::<Position>().map(|position| position.x),
        _ => None,
    };
    assert_eq!(x_at(&mut indexed, 5), Some(1));
    assert_eq!(x_at(&mut indexed, 19), Some(2));
    assert_eq!(x_at(&mut indexed, 20), None);
    assert_eq!(x_at(&mut indexed, 30), None);
    assert_eq!(x_at(&mut indexed, 36), Some(3));
}

#[test]
fn overlapping_write_is_refused_and_stream_continues() {
    init_logging();
    let network = ChannelNetwork::new(ChannelConfig::default(), record_kinds(), 1);
    let mut writer = network
        .master()
        .add_write_token::<Position>(EntryOptions {
            time_aspect: TimeAspect::Stream,
            ..EntryOptions::default()
        })
        .unwrap();
    network.settle(8);

    writer.write(Position::new(1, 1), TimeSpec::span(0, 10)).unwrap();
    assert!(writer.write(Position::new(2, 2), TimeSpec::span(5, 15)).is_err());
    assert_eq!(writer.write(Position::new(3, 3), TimeSpec::span(10, 20)), Ok(2));

    network.broadcast_data(0).unwrap();
    let mut reader = network
        .end(1)
        .add_read_token::<Position>(ReadOptions {
            mode: ReadMode::Sequential,
            ..ReadOptions::default()
        })
        .unwrap();
    // a reader attached late starts at the oldest retained record
    assert_eq!(drain(&mut reader), vec![Seen::At(3, TimeSpec::span(10, 20))]);
}
