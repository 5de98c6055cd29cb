//! Integration tests for the Workbench concurrency core

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use workbench::{
    BoundedQueue, CommandExecutor, EventPump, GlobalLock, GuardedScalar, Mailbox, StreamPool,
    StreamStatus, sync::Barrier, thread,
};

/// Scenario: a worker thread runs `echo hi` and observes exit code 0.
#[test]
fn test_command_from_worker_thread() {
    let executor = Arc::new(CommandExecutor::new());
    let worker = {
        let executor = Arc::clone(&executor);
        thread::spawn_joinable("echo-worker", move || executor.run("echo hi"))
    };
    assert_eq!(worker.join().unwrap(), 0);
}

/// Scenario: the UI thread runs a command while its event pump keeps firing.
#[test]
fn test_ui_thread_wait_pumps_events() {
    struct Pump(AtomicUsize);
    impl EventPump for Pump {
        fn pump(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    let executor = CommandExecutor::new();
    let pump = Pump(AtomicUsize::new(0));
    assert_eq!(executor.run_pumped("sleep 0.3", &pump), 0);
    let pumped = pump.0.load(Ordering::SeqCst);
    assert!(pumped >= 10, "expected steady pumping, saw {pumped} calls");
}

/// Scenario: stream two lines, then end-of-stream with exit status 0.
#[test]
fn test_stream_two_lines_then_status() {
    let pool = StreamPool::new();
    let mut stream = pool.open("printf 'a\\nb\\n'").unwrap();
    assert_eq!(stream.next_line().unwrap().as_deref(), Some("a"));
    assert_eq!(stream.next_line().unwrap().as_deref(), Some("b"));
    assert_eq!(stream.next_line().unwrap(), None);
    assert_eq!(stream.status(), StreamStatus::Exited(0));
}

/// Scenario: killing a stream mid-output frees its context for reuse even
/// though the underlying command would run for much longer.
#[test]
fn test_kill_midstream_frees_context() {
    let pool = StreamPool::new();
    let mut stream = pool.open("echo head; exec sleep 60").unwrap();
    assert_eq!(stream.next_line().unwrap().as_deref(), Some("head"));
    stream.kill().unwrap();
    assert_eq!(pool.open_count(), 0);

    let mut reused = pool.open("echo again").unwrap();
    assert_eq!(reused.context(), stream.context());
    assert_eq!(reused.next_line().unwrap().as_deref(), Some("again"));
}

/// Two lockers of the same path are never inside the critical section at
/// once; the second proceeds only after the first releases.
#[test]
fn test_global_lock_mutual_exclusion() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("exclusive.lock");
    let concurrently_held = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    crossbeam::thread::scope(|s| {
        for _ in 0..4 {
            let path = path.clone();
            let concurrently_held = Arc::clone(&concurrently_held);
            let peak = Arc::clone(&peak);
            s.spawn(move |_| {
                for _ in 0..5 {
                    let lock = GlobalLock::acquire(&path).unwrap();
                    let now = concurrently_held.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(2));
                    concurrently_held.fetch_sub(1, Ordering::SeqCst);
                    lock.unlock();
                }
            });
        }
    })
    .unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

/// No barrier party proceeds alone: every release observes all N arrivals.
#[test]
fn test_barrier_releases_all_parties_together() {
    const PARTIES: usize = 6;
    let barrier = Barrier::new(PARTIES);
    let arrived = AtomicUsize::new(0);
    let released = AtomicUsize::new(0);
    crossbeam::thread::scope(|s| {
        for _ in 0..PARTIES {
            s.spawn(|_| {
                arrived.fetch_add(1, Ordering::SeqCst);
                barrier.wait();
                assert_eq!(arrived.load(Ordering::SeqCst), PARTIES);
                released.fetch_add(1, Ordering::SeqCst);
            });
        }
    })
    .unwrap();
    assert_eq!(released.load(Ordering::SeqCst), PARTIES);
}

/// Producer worker funnels formatted lines through a mailbox; the "UI"
/// side drains it by polling, the way an event loop would.
#[test]
fn test_mailbox_log_fan_in() {
    const MESSAGES: usize = 50;
    let mailbox = Arc::new(Mailbox::new(8));

    let producer = {
        let mailbox = Arc::clone(&mailbox);
        thread::spawn_joinable("log-producer", move || {
            for i in 0..MESSAGES {
                mailbox.put(format!("line {i}")).unwrap();
            }
        })
    };

    let mut received = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while received.len() < MESSAGES {
        assert!(Instant::now() < deadline, "consumer starved");
        match mailbox.get() {
            Some(line) => received.push(line),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    producer.join().unwrap();
    assert_eq!(received.first().map(String::as_str), Some("line 0"));
    assert_eq!(received.last().map(String::as_str), Some("line 49"));
}

/// Push/pop storm: the live count respects the capacity bound throughout
/// and every entry pushed is eventually popped.
#[test]
fn test_queue_capacity_under_contention() {
    const CAPACITY: usize = 5;
    const PER_PRODUCER: usize = 100;
    let queue = BoundedQueue::new(CAPACITY);
    let popped = AtomicUsize::new(0);

    crossbeam::thread::scope(|s| {
        for p in 0..4 {
            let queue = &queue;
            s.spawn(move |_| {
                for i in 0..PER_PRODUCER {
                    let count = queue
                        .push(format!("p{p}-{i}"), Duration::from_secs(10))
                        .unwrap();
                    assert!((1..=CAPACITY).contains(&count));
                }
            });
        }
        s.spawn(|_| {
            while popped.load(Ordering::SeqCst) < 4 * PER_PRODUCER {
                let took = if popped.load(Ordering::SeqCst) % 2 == 0 {
                    queue.pop_oldest()
                } else {
                    queue.pop_newest()
                };
                if took.is_some() {
                    popped.fetch_add(1, Ordering::SeqCst);
                } else {
                    std::thread::yield_now();
                }
            }
        });
    })
    .unwrap();
    assert!(queue.is_empty());
}

/// A guarded scalar shared across commands and threads stays consistent.
#[test]
fn test_scalar_counts_completed_commands() {
    let executor = Arc::new(CommandExecutor::new());
    let completed = Arc::new(GuardedScalar::new(0));

    let mut workers = Vec::new();
    for _ in 0..6 {
        let executor = Arc::clone(&executor);
        let completed = Arc::clone(&completed);
        workers.push(thread::spawn_joinable("counted-run", move || {
            let code = executor.run("true");
            assert_eq!(code, 0);
            completed.add(1)
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(completed.get(), 6);
}
