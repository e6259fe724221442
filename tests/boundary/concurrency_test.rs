/*!
 * Concurrent Boundary Tests
 */

use crate::fixtures::{object, Part};
use membrane::{PolicyDecision, PolicyHooks, Sandbox, Table, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 8;
const ITERATIONS: usize = 200;

#[test]
fn test_concurrent_wrap_single_proxy() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let sandbox = sandbox.clone();
            let raw = object(&part);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                sandbox.wrap(&raw).unwrap()
            })
        })
        .collect();

    let proxies: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for proxy in &proxies[1..] {
        assert!(proxy.same(&proxies[0]));
    }
    assert_eq!(sandbox.registry().len(), 1);
}

#[test]
fn test_concurrent_reads_and_writes() {
    let denied = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&denied);
    let hooks = PolicyHooks::new().on_write(move |_, key, _| {
        if key.as_str() == Some("Locked") {
            counter.fetch_add(1, Ordering::Relaxed);
            PolicyDecision::deny("locked")
        } else {
            PolicyDecision::Allow
        }
    });
    let sandbox = Sandbox::new(hooks);
    let part = Part::new("Part").with("Locked", 0);
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let sandbox = sandbox.clone();
            let proxy = proxy.clone();
            thread::spawn(move || {
                let key = Value::str(format!("slot{}", t));
                for i in 0..ITERATIONS {
                    sandbox.write(&proxy, &key, &Value::Int(i as i64)).unwrap();
                    assert!(sandbox.write(&proxy, &"Locked".into(), &Value::Int(1)).is_err());
                    let _ = sandbox.read(&proxy, &key).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(denied.load(Ordering::Relaxed), THREADS * ITERATIONS);
    assert_eq!(part.prop("Locked"), Value::Int(0));
    for t in 0..THREADS {
        assert_eq!(
            part.prop(&format!("slot{}", t)),
            Value::Int(ITERATIONS as i64 - 1)
        );
    }
}

#[test]
fn test_concurrent_shared_table() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let parts: Vec<_> = (0..16).map(|_| Part::new("Part")).collect();
    let raw = Table::sequence(parts.iter().map(object));
    let raw = Value::from(raw);

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let sandbox = sandbox.clone();
            let raw = raw.clone();
            thread::spawn(move || {
                for _ in 0..ITERATIONS {
                    sandbox.wrap(&raw).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let wrapped = sandbox.wrap(&raw).unwrap();
    let table = wrapped.as_table().unwrap();
    assert_eq!(table.len(), 16);
    for (index, part) in parts.iter().enumerate() {
        let proxy = table.get(index as i64 + 1);
        assert!(sandbox.unwrap(&proxy).unwrap().same(&object(part)));
    }
}
