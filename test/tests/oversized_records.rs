/// A record too large for a message size mark is skipped by the packer, the
/// records around it and the other entries still go out

use tandem_serde::WireStore;
use tandem_shared::{ChannelConfig, EntryOptions, ReadOptions, ReadOutcome, TimeSpec, MAX_TIMETICK};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Counter, Position, Waypoint};

fn waypoint(x: i32, name_len: usize) -> Waypoint {
    Waypoint {
        position: Position::new(x, 0),
        name: "w".repeat(name_len),
    }
}

#[test]
fn oversized_record_is_skipped_and_the_rest_delivered() {
    init_logging();
    let network = ChannelNetwork::new(ChannelConfig::default(), record_kinds(), 1)
        .with_data_capacity(100_000);
    let mut waypoints = network
        .master()
        .add_write_token::<Waypoint>(EntryOptions::default())
        .unwrap();
    let mut counter = network
        .master()
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(8);
    let mut reader = network.end(1).add_read_token::<Waypoint>(ReadOptions::default()).unwrap();

    waypoints.write(waypoint(1, 4), TimeSpec::event(1)).unwrap();
    waypoints.write(waypoint(2, 70_000), TimeSpec::event(2)).unwrap();
    counter.write(Counter { value: 9 }, TimeSpec::event(2)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![2]);

    let remote = network.end(1).entry(waypoints.entry_id().unwrap()).unwrap();
    assert_eq!(remote.latest_sequence(), 1);
    let remote_counter = network.end(1).entry(counter.entry_id().unwrap()).unwrap();
    assert_eq!(remote_counter.latest_sequence(), 1);

    // later records are not held up by the skipped one
    waypoints.write(waypoint(3, 4), TimeSpec::event(3)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![1]);
    assert_eq!(remote.latest_sequence(), 2);
    match reader.read(MAX_TIMETICK) {
        ReadOutcome::Data(access) => assert_eq!(access.get::<Waypoint>(), Some(&waypoint(3, 4))),
        _ => panic!("Expected the waypoint written after the oversized one"),
    };
}

#[test]
fn skipped_record_leaves_no_bytes_behind() {
    init_logging();
    let network = ChannelNetwork::new(ChannelConfig::default(), record_kinds(), 0);
    let mut writer = network
        .master()
        .add_write_token::<Waypoint>(EntryOptions::default())
        .unwrap();
    network.settle(4);

    writer.write(waypoint(1, 4), TimeSpec::event(1)).unwrap();
    writer.write(waypoint(2, 70_000), TimeSpec::event(2)).unwrap();
    writer.write(waypoint(3, 4), TimeSpec::event(3)).unwrap();

    let mut store = WireStore::new(100_000);
    let report = network.master().pack_data(0, &mut store).unwrap();
    assert_eq!(report.messages, 2);
    assert_eq!(report.skipped, 1);
    assert!(!report.store_full);
    assert_eq!(report.complete_len, store.len());
    assert!(store.len() < 200);

    let mut store = WireStore::new(100_000);
    let report = network.master().pack_data(0, &mut store).unwrap();
    assert_eq!(report.messages, 0);
    assert_eq!(report.skipped, 0);
}
