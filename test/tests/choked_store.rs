/// A store that runs out of room is closed for good: nothing more is written
/// into it, and only the complete messages before the overrun are sent

use tandem_serde::{SerdeErr, WireReader, WireStore};
use tandem_shared::{
    ChannelConfig, DataHeader, DataMessageKind, EntryOptions, ReadOptions, ReadOutcome, TimeSpec,
    MAX_TIMETICK,
};
use tandem_test::{init_logging, record_kinds, ChannelNetwork, Counter};

#[test]
fn second_write_chokes_a_small_store() {
    let mut store = WireStore::new(8);
    store.write_bytes(&[1; 6]).unwrap();

    assert_eq!(
        store.write_bytes(&[2; 6]),
        Err(SerdeErr::BufferBoundary {
            requested: 6,
            available: 2
        })
    );
    assert!(store.is_choked());
    assert_eq!(store.len(), 6);

    // would have fit before the overrun
    assert!(matches!(
        store.write_bytes(&[3; 1]),
        Err(SerdeErr::BufferBoundary { available: 0, .. })
    ));
    assert!(store.pack(&7u8).is_err());
    assert_eq!(store.as_bytes(), &[1; 6]);
}

// header 3 + mark 2 + sequence 4 + time 8 + counter 8
const COUNTER_MESSAGE: usize = 25;

#[test]
fn records_that_did_not_fit_go_out_next_time() {
    init_logging();
    let network = ChannelNetwork::new(
        ChannelConfig {
            name: "tally".to_string(),
            ..ChannelConfig::default()
        },
        record_kinds(),
        1,
    )
    .with_data_capacity(2 * COUNTER_MESSAGE + 10);

    let mut writer = network
        .master()
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(8);

    for value in 1..=5 {
        writer.write(Counter { value }, TimeSpec::event(value as u32)).unwrap();
    }
    assert_eq!(network.take_pending(0), 5);

    // three stores of two, two and one message
    assert_eq!(network.broadcast_data(0).unwrap(), vec![5]);

    let remote = network.end(1).entry(0).unwrap();
    assert_eq!(remote.latest_sequence(), 5);
    let mut reader = network.end(1).add_read_token::<Counter>(ReadOptions::default()).unwrap();
    match reader.read(MAX_TIMETICK) {
        ReadOutcome::Data(access) => assert_eq!(access.get::<Counter>(), Some(&Counter { value: 5 })),
        _ => panic!("Expected the newest counter"),
    };
}

#[test]
fn pack_report_stops_at_the_last_complete_message() {
    init_logging();
    let network = ChannelNetwork::new(ChannelConfig::default(), record_kinds(), 0);
    let mut writer = network
        .master()
        .add_write_token::<Counter>(EntryOptions::default())
        .unwrap();
    network.settle(4);
    let master = network.master();
    let transport = 0;

    writer.write(Counter { value: 1 }, TimeSpec::event(1)).unwrap();
    writer.write(Counter { value: 2 }, TimeSpec::event(2)).unwrap();

    let mut store = WireStore::new(COUNTER_MESSAGE + 12);
    let report = master.pack_data(transport, &mut store).unwrap();
    assert_eq!(report.messages, 1);
    assert!(report.store_full);
    assert_eq!(report.complete_len, COUNTER_MESSAGE);
    assert!(store.len() > report.complete_len);

    let mut reader = WireReader::new(&store.as_bytes()[..report.complete_len]);
    let header: DataHeader = reader.unpack().unwrap();
    assert_eq!(header.kind, DataMessageKind::FullData);
    assert_eq!(header.entry, 0);

    let mut store = WireStore::new(256);
    let report = master.pack_data(transport, &mut store).unwrap();
    assert_eq!(report.messages, 1);
    assert!(!report.store_full);
    let mut reader = WireReader::new(store.as_bytes());
    reader.unpack::<DataHeader>().unwrap();
    reader.read_mark().unwrap();
    assert_eq!(reader.unpack::<u32>().unwrap(), 2);
}
