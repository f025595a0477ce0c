/// Fuzzes the entry log's claim counting: one writer appends and recycles
/// while reader threads pin and read at random positions. A reader must never
/// observe a recycled record, and every node must come back once all
/// readers are gone.

use std::{
    sync::atomic::{AtomicBool, Ordering},
    thread,
};

use tandem_shared::{EntryLog, Retention, SaveupMode, SequentialRead, TimeAspect, TimeSpec};

const WRITES: u32 = 20_000;

/// Each record holds its own time stamp, so a reader can tell a recycled
/// slot from the record it asked for
fn record(tick: u32) -> (u32, u64) {
    (tick, u64::from(tick) * 3 + 1)
}

#[test]
fn random_readers_never_see_recycled_records() {
    let log: EntryLog<(u32, u64)> = EntryLog::new(
        TimeAspect::Event,
        Retention { span: 0, depth: 16 },
        SaveupMode::None,
    )
    .unwrap();
    let done = AtomicBool::new(false);
    // attached before the first write, so it has to see every record
    let mut cursor = log.attach_sequential();

    thread::scope(|scope| {
        for seed in 0..4u64 {
            let log = &log;
            let done = &done;
            scope.spawn(move || {
                let mut rng = fastrand::Rng::with_seed(seed);
                let mut reads = 0u64;
                while !done.load(Ordering::Acquire) {
                    let latest = log.latest_sequence();
                    let tick = if rng.bool() {
                        u32::MAX
                    } else {
                        rng.u32(0..=latest.saturating_mul(2).max(1))
                    };
                    if let Some(access) = log.read_at(tick) {
                        let (stamp, value) = *access;
                        assert_eq!(access.time(), TimeSpec::event(stamp));
                        assert!(stamp <= tick);
                        assert_eq!(value, record(stamp).1);
                        // hold the claim a little while the writer keeps going
                        for _ in 0..rng.usize(0..64) {
                            std::hint::spin_loop();
                        }
                        assert_eq!(*access, record(stamp));
                        reads += 1;
                    }
                }
                reads
            });
        }

        let log = &log;
        scope.spawn(move || {
            let mut expected = 1;
            while expected <= WRITES {
                match log.read_sequential(&mut cursor, u32::MAX) {
                    SequentialRead::Data(access) => {
                        assert_eq!(access.sequence(), expected);
                        assert_eq!(*access, record(expected * 2));
                        expected += 1;
                    }
                    SequentialRead::Gap(_) => panic!("event logs have no gaps"),
                    SequentialRead::Nothing => thread::yield_now(),
                }
            }
            log.detach_sequential(cursor);
        });

        for sequence in 1..=WRITES {
            let tick = sequence * 2;
            log.append(record(tick), TimeSpec::event(tick)).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    assert_eq!(log.latest_sequence(), WRITES);
    assert_eq!(log.sequential_readers(), 0);
    // retained records plus the sentinel, once the next write recycles
    log.append(record(WRITES * 2 + 2), TimeSpec::event(WRITES * 2 + 2)).unwrap();
    assert_eq!(log.live_nodes(), 17);
    assert!(log.drain_for_deletion());
}

#[test]
fn racing_pins_keep_oldest_readable() {
    let log: EntryLog<u32> = EntryLog::new(
        TimeAspect::Stream,
        Retention { span: 0, depth: 1 },
        SaveupMode::None,
    )
    .unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for seed in 10..14u64 {
            let log = &log;
            let done = &done;
            scope.spawn(move || {
                let mut rng = fastrand::Rng::with_seed(seed);
                while !done.load(Ordering::Acquire) {
                    let held: Vec<_> = (0..rng.usize(1..4)).filter_map(|_| log.read_latest()).collect();
                    for access in &held {
                        let time = access.time();
                        assert_eq!(time.end - time.start, 5);
                        assert_eq!(**access, time.start / 5);
                    }
                }
            });
        }

        for index in 0..WRITES {
            log.append(index, TimeSpec::span(index * 5, index * 5 + 5)).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    log.append(WRITES, TimeSpec::span(WRITES * 5, WRITES * 5 + 5)).unwrap();
    assert_eq!(log.retained_count(), 1);
    assert_eq!(log.live_nodes(), 2);
}
