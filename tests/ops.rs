use std::{error::Error, thread};

use atomic_field_update::{FieldError, FieldUpdater, ManagedObject, NoBarrier, UpdaterConfig, Value};

const NUM_THREADS: usize = 32;
const NUM_ADDS: usize = 10_000;

#[test]
fn test_fetch_and_add() -> Result<(), Box<dyn Error>> {
    let updater = FieldUpdater::new(NoBarrier);
    let obj = ManagedObject::from_values(0, [Value::int(10), Value::EMPTY]);

    assert_eq!(updater.fetch_and_add_field(&obj, 0, 5)?, 10);
    assert_eq!(updater.fetch_and_add_field(&obj, 0, -20)?, 15);
    assert_eq!(updater.load_field(&obj, 0)?, Value::int(-5));

    assert_eq!(
        updater.fetch_and_add_field(&obj, 1, 1),
        Err(FieldError::NotAnInteger {
            index: 1,
            value: Value::EMPTY
        })
    );
    assert_eq!(updater.load_field(&obj, 1)?, Value::EMPTY);
    Ok(())
}

#[test]
fn test_fetch_and_add_rejects_references() {
    let updater = FieldUpdater::new(NoBarrier);
    let target = ManagedObject::new(0, 0);
    let obj = ManagedObject::from_values(0, [target.as_value()]);

    assert_eq!(
        updater.fetch_and_add_field(&obj, 0, 1),
        Err(FieldError::NotAnInteger {
            index: 0,
            value: target.as_value()
        })
    );
    assert_eq!(obj.fields(), vec![target.as_value()]);
}

#[test]
fn test_concurrent_fetch_and_add() {
    let updater = FieldUpdater::with_config(
        NoBarrier,
        UpdaterConfig {
            contention_warn_threshold: 1,
            ..Default::default()
        },
    );
    let obj = ManagedObject::from_values(0, [Value::int(7)]);

    let previous: Vec<Vec<isize>> = thread::scope(|s| {
        let handles: Vec<_> = (0..NUM_THREADS)
            .map(|_| {
                let updater = &updater;
                let obj = &obj;
                s.spawn(move || {
                    (0..NUM_ADDS)
                        .map(|_| updater.fetch_and_add_field(obj, 0, 1).unwrap())
                        .collect::<Vec<isize>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(
        updater.load_field(&obj, 0),
        Ok(Value::int(7 + (NUM_THREADS * NUM_ADDS) as isize))
    );
    // Every intermediate value was handed out exactly once.
    let mut seen: Vec<isize> = previous.into_iter().flatten().collect();
    seen.sort_unstable();
    let expected: Vec<isize> = (7..7 + (NUM_THREADS * NUM_ADDS) as isize).collect();
    assert_eq!(seen, expected);
}

#[test]
fn test_update_field_max() {
    // A lock-free running maximum, one of the things update_field exists for.
    let updater = FieldUpdater::new(NoBarrier);
    let obj = ManagedObject::new(0, 1);

    thread::scope(|s| {
        for n in 0..NUM_THREADS {
            let updater = &updater;
            let obj = &obj;
            s.spawn(move || {
                for i in 0..1000 {
                    let candidate = (i * NUM_THREADS + n) as isize;
                    updater
                        .update_field(obj, 0, |v| {
                            let current = v.as_int().unwrap();
                            if candidate > current {
                                *v = Value::int(candidate);
                                (true, ())
                            } else {
                                (false, ())
                            }
                        })
                        .unwrap();
                }
            });
        }
    });

    assert_eq!(
        updater.load_field(&obj, 0),
        Ok(Value::int((1000 * NUM_THREADS - 1) as isize))
    );
}

#[test]
fn test_exchange_returns_previous() {
    let updater = FieldUpdater::new(NoBarrier);
    let obj = ManagedObject::new(0, 1);
    let mut expected_previous = Value::UNIT;
    for i in 1..100 {
        assert_eq!(updater.exchange_field(&obj, 0, Value::int(i)), Ok(expected_previous));
        expected_previous = Value::int(i);
    }
    assert!(updater.exchange_field(&obj, 1, Value::UNIT).is_err());
}
