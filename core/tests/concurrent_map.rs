use std::sync::Arc;
use std::thread;

use concur_core::ConcurrentMap;

fn threads_number() -> usize {
    std::env::var("HCVD_CM_TEST_THREADS_NUMBER")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(50)
}

#[test]
fn readers_keep_working_while_writers_force_several_resizes() {
    let map = Arc::new(ConcurrentMap::<usize, usize>::with_bucket_count(2));
    let threads = threads_number();
    let per_thread = 40usize;

    thread::scope(|scope| {
        for t in 0..threads {
            let map = map.clone();
            scope.spawn(move || {
                for i in 0..per_thread {
                    let key = t * per_thread + i;
                    map.insert(key, key * 2);
                }
            });
        }

        // Readers run the whole time, including while growth is in
        // progress; a bucket marked obsolete mid-lookup must transparently
        // retry against the new layout rather than returning a wrong value.
        for _ in 0..4 {
            let map = map.clone();
            scope.spawn(move || {
                for _ in 0..2000 {
                    if let Some(value) = map.get(&0) {
                        assert_eq!(value, 0);
                    }
                }
            });
        }
    });

    assert_eq!(map.len(), threads * per_thread);
    assert!(map.bucket_count() > 2);
    for t in 0..threads {
        for i in 0..per_thread {
            let key = t * per_thread + i;
            assert_eq!(map.get(&key), Some(key * 2));
        }
    }
}

#[test]
fn duplicate_insert_leaves_the_original_value_and_size_in_place() {
    let map = ConcurrentMap::<&str, i32>::new();
    assert!(map.insert("a", 1));
    assert!(!map.insert("a", 2));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"a"), Some(1));
}

#[test]
fn a_get_right_after_a_successful_insert_always_sees_its_own_write() {
    // 50 threads mix inserts, gets and removes over keys 0..1000 against a
    // map that starts with a single bucket, so every thread also drives at
    // least a few resizes. Whatever else is going on, a thread's own insert
    // must always be visible to its own immediately-following get.
    let map = Arc::new(ConcurrentMap::<usize, usize>::with_bucket_count(1));
    let threads = threads_number();

    thread::scope(|scope| {
        for t in 0..threads {
            let map = map.clone();
            scope.spawn(move || {
                for key in (t..1000).step_by(threads.max(1)) {
                    if map.insert(key, key) {
                        assert_eq!(map.get(&key), Some(key));
                    }
                    map.get(&key);
                    map.remove(&key);
                }
            });
        }
    });
}
