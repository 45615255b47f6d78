use recordbuffer::budget::ElementCost;
use recordbuffer::fixedsize::{self, FixedSizeRecordBuffer};
use recordbuffer::record::{LogRecord, Record, RecordHandle, Severity};
use recordbuffer::recordbuffer::{PushOutcome, RecordBuffer, RecordBufferError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, mpsc};
use std::thread;
use std::time::Duration;

/// Integration tests for concurrent producers and consumers sharing one buffer
/// under a tight byte budget.

// A record that flags when a thread is holding it after reading it off an end.
struct Tracked {
    id: usize,
    size: usize,
    in_hand: AtomicBool,
}

impl Record for Tracked {
    fn footprint(&self) -> usize {
        self.size
    }
}

fn tracked(id: usize, size: usize) -> RecordHandle<Tracked> {
    Arc::new(Tracked {
        id,
        size,
        in_hand: AtomicBool::new(false),
    })
}

#[test]
fn test_concurrent_push_pop_stress() {
    const THREADS: usize = 8;
    const ITERATIONS: usize = 1000;
    const CAPACITY: usize = 4 * 1024;

    let buffer = Arc::new(FixedSizeRecordBuffer::<Tracked>::new(CAPACITY).unwrap());
    let start = Arc::new(Barrier::new(THREADS));

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let buffer = Arc::clone(&buffer);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                let mut rng = fastrand::Rng::with_seed(t as u64);
                start.wait();
                for i in 0..ITERATIONS {
                    let record = tracked(t * ITERATIONS + i, rng.usize(16..256));
                    let _ = buffer.push_back(record);
                    assert!(buffer.used_bytes() <= CAPACITY);

                    if i % 3 == 0 {
                        let _ = buffer.pop_front();
                    } else if i % 3 == 1 {
                        let seq = buffer.begin_sequence();
                        if let Ok(front) = seq.front() {
                            // Nobody else can be holding the front while we hold the lock.
                            assert!(!front.in_hand.swap(true, Ordering::SeqCst));
                            let popped = seq.pop_front().unwrap();
                            assert_eq!(popped.id, front.id);
                            front.in_hand.store(false, Ordering::SeqCst);
                        }
                    }
                }
            })
        })
        .collect();

    for w in workers {
        w.join().unwrap();
    }

    let overhead = buffer.element_cost().overhead();
    let held: usize = buffer.handles().iter().map(|h| h.size + overhead).sum();
    assert_eq!(buffer.used_bytes(), held);
    assert!(buffer.used_bytes() <= CAPACITY);
    assert_eq!(buffer.len(), buffer.handles().len());

    let stats = buffer.stats();
    assert_eq!(stats.accepted, (THREADS * ITERATIONS) as u64);
    assert_eq!(stats.discarded, 0);
    assert_eq!(
        stats.accepted,
        stats.evicted + stats.popped + buffer.len() as u64
    );
}

#[test]
fn test_sequence_blocks_other_writers() {
    let buffer = Arc::new(FixedSizeRecordBuffer::<Tracked>::new(64 * 1024).unwrap());
    for id in 0..5 {
        let _ = buffer.push_back(tracked(id, 32));
    }

    let (locked_tx, locked_rx) = mpsc::channel();
    let writer = {
        let buffer = Arc::clone(&buffer);
        thread::spawn(move || {
            locked_rx.recv().unwrap();
            buffer.push_back(tracked(100, 32))
        })
    };

    let seq = buffer.begin_sequence();
    locked_tx.send(()).unwrap();

    // The writer is now parked on the lock; nothing it does can show up here.
    thread::sleep(Duration::from_millis(50));
    assert_eq!(seq.len(), 5);

    let mut lifo = Vec::new();
    while !seq.is_empty() {
        lifo.push(seq.back().unwrap().id);
        seq.pop_back().unwrap();
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(lifo, vec![4, 3, 2, 1, 0]);
    assert_eq!(seq.len(), 0);
    seq.end();

    assert!(writer.join().unwrap().is_accepted());
    let remaining: Vec<usize> = buffer.handles().iter().map(|h| h.id).collect();
    assert_eq!(remaining, vec![100]);
}

#[test]
fn test_producers_at_both_ends() {
    // Each side keeps its most recent pushes and loses the other side's oldest first.
    let buffer = FixedSizeRecordBuffer::with_options(
        100,
        ElementCost::new(0),
        fixedsize::opposite_end_evictor,
        0,
    )
    .unwrap();
    for id in 0..5 {
        assert!(buffer.push_back(tracked(id, 10)).is_accepted());
    }
    for id in 10..15 {
        assert!(buffer.push_front(tracked(id, 10)).is_accepted());
    }
    // Full at 100 bytes: [14 13 12 11 10 0 1 2 3 4]
    assert_eq!(buffer.push_back(tracked(5, 20)), PushOutcome::Accepted { evicted: 2 });
    assert_eq!(buffer.push_front(tracked(15, 10)), PushOutcome::Accepted { evicted: 1 });

    let ids: Vec<usize> = buffer.handles().iter().map(|h| h.id).collect();
    assert_eq!(ids, vec![15, 12, 11, 10, 0, 1, 2, 3, 4]);
    assert_eq!(buffer.used_bytes(), 90);
}

struct DropCounted {
    drops: Arc<AtomicUsize>,
}

impl Record for DropCounted {
    fn footprint(&self) -> usize {
        64
    }
}

impl Drop for DropCounted {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_records_destroyed_when_released() {
    let drops = Arc::new(AtomicUsize::new(0));
    let buffer = FixedSizeRecordBuffer::with_options(
        256,
        ElementCost::new(0),
        fixedsize::opposite_end_evictor,
        0,
    )
    .unwrap();
    let make = || {
        Arc::new(DropCounted {
            drops: Arc::clone(&drops),
        })
    };

    for _ in 0..4 {
        let _ = buffer.push_back(make());
    }
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // Evicts one.
    let _ = buffer.push_back(make());
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    // Still held outside the buffer: popping alone does not destroy it.
    let kept = buffer.begin_sequence().front().unwrap();
    drop(buffer.pop_front().unwrap());
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(kept);
    assert_eq!(drops.load(Ordering::SeqCst), 2);

    buffer.remove_all();
    assert_eq!(drops.load(Ordering::SeqCst), 5);

    let _ = buffer.push_back(make());
    drop(buffer);
    assert_eq!(drops.load(Ordering::SeqCst), 6);
}

#[test]
fn test_matches_reference_model() {
    const CAPACITY: usize = 500;
    let buffer = FixedSizeRecordBuffer::with_options(
        CAPACITY,
        ElementCost::new(0),
        fixedsize::opposite_end_evictor,
        0,
    )
    .unwrap();
    let mut model: VecDeque<(usize, usize)> = VecDeque::new();
    let mut rng = fastrand::Rng::with_seed(7);

    for id in 0..5000 {
        let size = rng.usize(1..600);
        match rng.u8(0..5) {
            0 | 1 => {
                let outcome = buffer.push_back(tracked(id, size));
                if size > CAPACITY {
                    assert_eq!(outcome, PushOutcome::Discarded);
                } else {
                    let mut evicted = 0;
                    while model.iter().map(|r| r.1).sum::<usize>() + size > CAPACITY {
                        model.pop_front();
                        evicted += 1;
                    }
                    model.push_back((id, size));
                    assert_eq!(outcome, PushOutcome::Accepted { evicted });
                }
            }
            2 => {
                let outcome = buffer.push_front(tracked(id, size));
                if size > CAPACITY {
                    assert_eq!(outcome, PushOutcome::Discarded);
                } else {
                    let mut evicted = 0;
                    while model.iter().map(|r| r.1).sum::<usize>() + size > CAPACITY {
                        model.pop_back();
                        evicted += 1;
                    }
                    model.push_front((id, size));
                    assert_eq!(outcome, PushOutcome::Accepted { evicted });
                }
            }
            3 => match model.pop_front() {
                Some((id, _)) => assert_eq!(buffer.pop_front().unwrap().id, id),
                None => assert_eq!(buffer.pop_front().err(), Some(RecordBufferError::Empty)),
            },
            _ => match model.pop_back() {
                Some((id, _)) => assert_eq!(buffer.pop_back().unwrap().id, id),
                None => assert_eq!(buffer.pop_back().err(), Some(RecordBufferError::Empty)),
            },
        }

        let used: usize = model.iter().map(|r| r.1).sum();
        assert_eq!(buffer.used_bytes(), used);
        assert!(used <= CAPACITY);
        assert_eq!(buffer.len(), model.len());
    }

    let ids: Vec<usize> = buffer.handles().iter().map(|h| h.id).collect();
    let expected: Vec<usize> = model.iter().map(|r| r.0).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_log_records_through_trait_object() {
    let buffer: Arc<dyn RecordBuffer<LogRecord>> =
        Arc::new(FixedSizeRecordBuffer::<LogRecord>::new(16 * 1024).unwrap());

    let producers: Vec<_> = (0..4)
        .map(|t| {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..100 {
                    let msg = format!("message no. {} from thread no. {}", i, t);
                    let record = LogRecord::new(Severity::Info, "worker", &msg)
                        .with_attribute("thread", &t.to_string());
                    let _ = buffer.push_back(record.into_handle());
                }
            })
        })
        .collect();
    for p in producers {
        p.join().unwrap();
    }

    let seq = buffer.begin_sequence();
    assert!(!seq.is_empty());
    let mut drained = 0;
    while !seq.is_empty() {
        let record = seq.back().unwrap();
        assert_eq!(record.category(), "worker");
        assert!(record.message().starts_with("message no. "));
        seq.pop_back().unwrap();
        drained += 1;
    }
    drop(seq);
    assert!(drained > 0);
    assert!(buffer.is_empty());
}
