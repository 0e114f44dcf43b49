use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use concur_core::config::EventManagerConfig;
use concur_core::event_manager::{
    call_with_callback, call_with_callback_types, call_with_result, CallType, EventManager,
};

fn threads_number() -> usize {
    std::env::var("HCVD_EM_TEST_THREADS_NUMBER")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(26)
}

fn sending_times() -> usize {
    std::env::var("HCVD_EM_TEST_SENDING_TIMES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(1000)
}

#[test]
fn many_threads_fire_while_others_subscribe_and_unsubscribe() {
    let manager = EventManager::new(EventManagerConfig { extra_threads_count: 4 }).unwrap();
    let received = Arc::new(AtomicUsize::new(0));

    let listener_received = received.clone();
    let _id = manager.add_listener("tick", CallType::AnyThreads, move |_event| {
        listener_received.fetch_add(1, Ordering::SeqCst);
    });

    let threads = threads_number();
    let per_thread = sending_times() / threads.max(1);

    thread::scope(|scope| {
        for _ in 0..threads {
            let manager = manager.clone();
            scope.spawn(move || {
                for i in 0..per_thread {
                    manager.fire_event("tick", i);
                }
            });
        }

        // A handful of threads churn extra short-lived subscriptions
        // concurrently with the firing threads above.
        for _ in 0..4 {
            let manager = manager.clone();
            scope.spawn(move || {
                for _ in 0..50 {
                    let id = manager.add_listener("side-channel", CallType::MainThread, |_event| {});
                    manager.remove_listener(id);
                }
            });
        }
    });

    manager.flush();
    assert_eq!(received.load(Ordering::SeqCst), threads * per_thread);
}

#[test]
fn asynchronous_call_forms_interleave_correctly() {
    let manager = EventManager::new(EventManagerConfig::default()).unwrap();

    let result_handle = call_with_result(&manager, || {
        (0..100).sum::<u32>()
    });
    assert_eq!(result_handle.wait(), 4950);

    let callback_seen = Arc::new(std::sync::Mutex::new(None));
    let callback_writer = callback_seen.clone();
    call_with_callback(&manager, || "payload".to_string(), move |value| {
        *callback_writer.lock().unwrap() = Some(value);
    });
    manager.flush();
    assert_eq!(callback_seen.lock().unwrap().as_deref(), Some("payload"));
}

#[test]
fn targeted_delivery_reaches_only_its_listener_under_contention() {
    let manager = EventManager::new(EventManagerConfig { extra_threads_count: 3 }).unwrap();
    let matches = Arc::new(AtomicUsize::new(0));
    let mismatches = Arc::new(AtomicUsize::new(0));

    let ids: Vec<_> = (0..10)
        .map(|n| {
            let matches = matches.clone();
            let mismatches = mismatches.clone();
            manager.add_targeted_listener(CallType::AnyThreads, move |event| {
                match event.downcast_ref::<usize>() {
                    Some(&value) if value == n => {
                        matches.fetch_add(1, Ordering::SeqCst);
                    }
                    _ => {
                        mismatches.fetch_add(1, Ordering::SeqCst);
                    }
                }
            })
        })
        .collect();

    for (n, id) in ids.iter().enumerate() {
        manager.fire_targeted(*id, n);
    }
    manager.flush();

    assert_eq!(matches.load(Ordering::SeqCst), ids.len());
    assert_eq!(mismatches.load(Ordering::SeqCst), 0);
}

#[test]
fn two_hundred_split_call_type_calls_all_land_on_the_accumulator() {
    // fn runs on AnyThreads, the callback that folds the result in runs on
    // MainThread; the two call types differ, so the callback must be
    // rescheduled as its own async call rather than inlined.
    let manager = EventManager::new(EventManagerConfig { extra_threads_count: 8 }).unwrap();
    let accumulator = Arc::new(AtomicUsize::new(0));

    for n in 0..200usize {
        let accumulator = accumulator.clone();
        call_with_callback_types(
            &manager,
            move || n,
            move |_value| {
                accumulator.fetch_add(1, Ordering::SeqCst);
            },
            CallType::AnyThreads,
            CallType::MainThread,
        );
    }
    manager.flush();

    assert_eq!(accumulator.load(Ordering::SeqCst), 200);
}

#[test]
fn twenty_six_listeners_each_receive_exactly_their_earlier_senders_count() {
    // Thread n (0-indexed, subscribed to letter n) fires to every letter
    // after its own, `repeats` times. Listener n therefore receives one
    // event per (earlier thread, repeat) pair: `n * repeats` events total.
    // Summed across all 26 listeners that's a triangular `26*25/2 * repeats`
    // events overall.
    let letters = threads_number().min(26);
    let repeats = (sending_times() / letters.max(1)).max(1);
    let manager = EventManager::new(EventManagerConfig { extra_threads_count: 4 }).unwrap();

    let counts: Vec<Arc<AtomicUsize>> = (0..letters).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    for (n, count) in counts.iter().enumerate() {
        let count = count.clone();
        manager.add_listener(letter_topic(n), CallType::AnyThreads, move |_event| {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }
    manager.flush();

    thread::scope(|scope| {
        for n in 0..letters {
            let manager = manager.clone();
            scope.spawn(move || {
                for _ in 0..repeats {
                    for target in (n + 1)..letters {
                        manager.fire_event(letter_topic(target), ());
                    }
                }
            });
        }
    });
    manager.flush();

    for (n, count) in counts.iter().enumerate() {
        assert_eq!(count.load(Ordering::SeqCst), n * repeats, "listener {n} saw the wrong count");
    }
    manager.stop();
}

fn letter_topic(n: usize) -> String {
    format!("letter.{n}")
}
