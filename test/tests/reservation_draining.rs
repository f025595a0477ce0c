/// An entry created with save-up reservations keeps all of its data until
/// that many reserving readers have attached, then prunes normally

use tandem_shared::{
    ChannelCommandType, ChannelConfig, EntryOptions, ReadOptions, Retention, SaveupMode, TimeSpec,
};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Counter};

fn reserving() -> ReadOptions {
    ReadOptions {
        reserve: true,
        ..ReadOptions::default()
    }
}

#[test]
fn saveup_is_removed_exactly_once() {
    init_logging();
    let config = ChannelConfig {
        name: "tally".to_string(),
        retention: Retention { span: 0, depth: 1 },
        ..ChannelConfig::default()
    };
    let network = ChannelNetwork::new(config, record_kinds(), 3);

    let mut writer = network
        .master()
        .add_write_token::<Counter>(EntryOptions {
            reservations: 2,
            ..EntryOptions::default()
        })
        .unwrap();
    network.settle(8);
    let entry = network.master().entry(0).unwrap();
    assert_eq!(entry.saveup(), SaveupMode::Active);

    for value in 1..=5 {
        writer.write(Counter { value }, TimeSpec::event(value as u32)).unwrap();
    }
    assert_eq!(entry.retained_count(), 5);

    // a reader that does not reserve changes nothing
    let _plain = network
        .end(1)
        .add_read_token::<Counter>(ReadOptions::default())
        .unwrap();
    let _first = network.end(1).add_read_token::<Counter>(reserving()).unwrap();
    network.rounds(3);
    assert_eq!(network.count_sent(ChannelCommandType::RemoveSaveupCmd), 0);
    assert_eq!(
        network.master().with_master(|master| master.reservations_left(0)),
        Some(Some(1))
    );

    let _second = network.end(2).add_read_token::<Counter>(reserving()).unwrap();
    let _third = network.end(3).add_read_token::<Counter>(reserving()).unwrap();
    network.rounds(4);
    assert_eq!(network.count_sent(ChannelCommandType::RemoveSaveupCmd), 1);

    for end in 1..4 {
        let remote = network.end(end).entry(0).unwrap();
        assert_ne!(remote.saveup(), SaveupMode::Active, "end {}", end);
    }

    writer.write(Counter { value: 6 }, TimeSpec::event(6)).unwrap();
    assert_eq!(entry.saveup(), SaveupMode::None);
    assert_eq!(entry.retained_count(), 1);
}

#[test]
fn readers_waiting_before_the_entry_count_towards_it() {
    init_logging();
    let network = ChannelNetwork::new(ChannelConfig::default(), record_kinds(), 1);

    let _reader = network.end(1).add_read_token::<Counter>(reserving()).unwrap();
    network.settle(8);

    let _writer = network
        .master()
        .add_write_token::<Counter>(EntryOptions {
            reservations: 1,
            ..EntryOptions::default()
        })
        .unwrap();
    network.rounds(4);

    assert_eq!(network.count_sent(ChannelCommandType::RemoveSaveupCmd), 1);
    assert_ne!(network.end(1).entry(0).unwrap().saveup(), SaveupMode::Active);
}
