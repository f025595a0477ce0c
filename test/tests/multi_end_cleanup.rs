/// Deleting an entry takes the confirmation of every end, and an end only
/// confirms once nothing on it still holds the entry's data

use tandem_shared::{
    ChannelCommand, ChannelCommandType, ChannelConfig, EntryOptions, ReadMode, ReadOptions,
    ReadOutcome, TimeSpec, MAX_TIMETICK,
};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Counter};

fn network() -> ChannelNetwork {
    let config = ChannelConfig {
        name: "counters".to_string(),
        ..ChannelConfig::default()
    };
    ChannelNetwork::new(config, record_kinds(), 2)
}

#[test]
fn entry_is_known_everywhere_before_it_is_deleted_everywhere() {
    init_logging();
    let network = network();

    let mut writer = network
        .end(1)
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(8);
    assert!(writer.is_valid());
    for end in 0..3 {
        assert_eq!(network.end(end).entry_ids(), vec![0], "end {}", end);
    }

    writer.write(Counter { value: 5 }, TimeSpec::event(1)).unwrap();
    network.broadcast_data(1).unwrap();
    assert_eq!(network.end(2).entry(0).unwrap().latest_sequence(), 1);

    drop(writer);
    network.rounds(6);

    let confirmations: Vec<u16> = network
        .sent_commands()
        .into_iter()
        .filter_map(|(_, command)| match command {
            ChannelCommand::CleanEntryConf { entry: 0, end } => Some(end),
            _ => None,
        })
        .collect();
    let mut sorted = confirmations.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2], "members confirm over the wire, once each");

    assert_eq!(network.count_sent(ChannelCommandType::DeleteEntryCmd), 1);
    for end in 0..3 {
        assert!(network.end(end).entry(0).is_none(), "end {}", end);
    }
    assert_eq!(
        network.master().with_master(|master| master.pending_cleanups()),
        Some(0)
    );
}

#[test]
fn attached_sequential_reader_holds_the_cleanup_back() {
    init_logging();
    let network = network();

    let mut writer = network
        .end(1)
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(8);

    let mut reader = network
        .end(2)
        .add_read_token::<Counter>(ReadOptions {
            mode: ReadMode::Sequential,
            ..ReadOptions::default()
        })
        .unwrap();
    assert_eq!(reader.attached_entries(), vec![0]);

    writer.write(Counter { value: 1 }, TimeSpec::event(1)).unwrap();
    writer.write(Counter { value: 2 }, TimeSpec::event(2)).unwrap();
    network.broadcast_data(1).unwrap();

    drop(writer);
    network.rounds(8);

    // end 2 still has unread data claimed by the reader
    assert!(network.end(2).entry(0).is_some());
    assert_eq!(network.count_sent(ChannelCommandType::DeleteEntryCmd), 0);
    assert!(network.count_sent(ChannelCommandType::CleanEntryCmd) > 1);

    // the next read notices the entry is gone and lets go of it
    assert!(matches!(reader.read(MAX_TIMETICK), ReadOutcome::NoData));
    assert!(reader.attached_entries().is_empty());
    network.rounds(4);

    assert_eq!(network.count_sent(ChannelCommandType::DeleteEntryCmd), 1);
    assert!(network.end(2).entry(0).is_none());
}

#[test]
fn freed_id_is_handed_out_again() {
    init_logging();
    let network = network();

    let first = network
        .end(1)
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(8);
    assert_eq!(first.entry_id(), Some(0));

    drop(first);
    network.rounds(6);

    let second = network
        .end(2)
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.rounds(4);
    assert_eq!(second.entry_id(), Some(0));
    assert_eq!(network.end(1).entry(0).unwrap().origin(), 2);
}
