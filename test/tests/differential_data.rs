/// Differential packing: receivers rebuild records from differences, and an
/// end that missed the base asks for a full record instead of guessing

use tandem_shared::{
    ChannelConfig, EntryOptions, PackingMode, ReadOptions, ReadOutcome, ReadToken, TimeSpec,
    MAX_TIMETICK,
};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Position};

fn latest(reader: &mut ReadToken) -> Option<Position> {
    match reader.read(MAX_TIMETICK) {
        ReadOutcome::Data(access) => access.get::<Position>().cloned(),
        _ => None,
    }
}

fn network(full_pack_interval: u32) -> ChannelNetwork {
    let config = ChannelConfig {
        name: "positions".to_string(),
        full_pack_interval,
        ..ChannelConfig::default()
    };
    ChannelNetwork::new(config, record_kinds(), 2)
}

fn differential() -> EntryOptions {
    EntryOptions {
        packing: PackingMode::Differential,
        ..EntryOptions::default()
    }
}

#[test]
fn receivers_rebuild_records_from_differences() {
    init_logging();
    let network = network(16);
    let mut writer = network.master().add_write_token::<Position>(differential()).unwrap();
    network.settle(8);
    let mut reader = network.end(1).add_read_token::<Position>(ReadOptions::default()).unwrap();

    writer.write(Position::new(1, 1), TimeSpec::event(1)).unwrap();
    writer.write(Position::new(2, 1), TimeSpec::event(2)).unwrap();
    writer.write(Position::new(2, 7), TimeSpec::event(3)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![3, 3]);

    assert_eq!(latest(&mut reader), Some(Position::new(2, 7)));
    assert_eq!(network.end(2).entry(0).unwrap().latest_sequence(), 3);
}

#[test]
fn missed_base_is_recovered_with_a_full_record() {
    init_logging();
    let network = network(16);
    let mut writer = network.master().add_write_token::<Position>(differential()).unwrap();
    network.settle(8);
    let mut late = network.end(2).add_read_token::<Position>(ReadOptions::default()).unwrap();

    // end 2 misses the full record
    writer.write(Position::new(5, 5), TimeSpec::event(1)).unwrap();
    assert_eq!(network.transfer_data(0, &[1]).unwrap(), vec![1]);

    writer.write(Position::new(6, 5), TimeSpec::event(2)).unwrap();
    writer.write(Position::new(7, 5), TimeSpec::event(3)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![2, 0]);
    assert_eq!(latest(&mut late), None);

    // end 2 asks the writer's end for a full record
    assert_eq!(network.transfer_data(2, &[0]).unwrap(), vec![1]);
    assert_eq!(network.transfer_data(2, &[0]).unwrap(), vec![0]);

    writer.write(Position::new(8, 9), TimeSpec::event(4)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![1, 1]);
    assert_eq!(latest(&mut late), Some(Position::new(8, 9)));

    writer.write(Position::new(8, 10), TimeSpec::event(5)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![1, 1]);
    assert_eq!(latest(&mut late), Some(Position::new(8, 10)));
}

#[test]
fn full_record_is_forced_at_the_interval() {
    init_logging();
    let network = network(2);
    let mut writer = network.master().add_write_token::<Position>(differential()).unwrap();
    network.settle(8);
    let mut late = network.end(2).add_read_token::<Position>(ReadOptions::default()).unwrap();

    // full, difference, difference: end 2 sees none of them
    for x in 1..=3 {
        writer.write(Position::new(x, 0), TimeSpec::event(x as u32)).unwrap();
    }
    assert_eq!(network.transfer_data(0, &[1]).unwrap(), vec![3]);

    // the interval is used up, so the fourth record goes out complete and
    // end 2 can start from it without asking
    writer.write(Position::new(4, 0), TimeSpec::event(4)).unwrap();
    assert_eq!(network.broadcast_data(0).unwrap(), vec![1, 1]);
    assert_eq!(latest(&mut late), Some(Position::new(4, 0)));
    assert_eq!(network.end(2).entry(0).unwrap().latest_sequence(), 1);
}
