use atomic_field_update::{ManagedObject, Value};
use rand::{rngs::ThreadRng, Rng};

#[test]
fn test_immediate_tagging() {
    let mut rand = ThreadRng::default();

    for _ in 1..100_000 {
        let n = rand.gen_range(isize::MIN >> 1..=isize::MAX >> 1);
        let v = Value::int(n);
        assert!(v.is_int());
        assert!(!v.is_reference());
        assert_eq!(v.as_int(), Some(n));
        assert_eq!(v.as_ptr(), None);
        assert_eq!(Value::from_raw(v.to_raw()), v);
    }
}

#[test]
fn test_references() {
    let objs: Vec<ManagedObject> = (0..64).map(|i| ManagedObject::new(i as u8, i)).collect();
    for obj in &objs {
        let v = obj.as_value();
        assert!(v.is_reference());
        assert!(!v.is_int());
        assert_eq!(v.as_int(), None);
        let back = unsafe { v.as_object() }.unwrap();
        assert!(std::ptr::eq(back, obj));
        assert_eq!(back.field_count(), obj.field_count());
    }
}

#[test]
fn test_special_words() {
    assert!(Value::EMPTY.is_empty());
    assert!(!Value::EMPTY.is_int());
    assert!(!Value::EMPTY.is_reference());
    assert_eq!(Value::default(), Value::EMPTY);

    assert_eq!(Value::UNIT, Value::int(0));
    assert_eq!(Value::from_bool(true), Value::TRUE);
    assert_eq!(Value::from(false), Value::FALSE);
    assert_eq!(Value::TRUE.as_bool(), Some(true));
    assert_eq!(Value::int(-3).as_bool(), Some(true));
    assert_eq!(Value::FALSE.as_bool(), Some(false));
    assert_eq!(format!("{:?}", Value::int(-7)), "Int(-7)");
    assert_eq!(format!("{:?}", Value::EMPTY), "Empty");
}

#[test]
fn test_object_layout() {
    let obj = ManagedObject::from_values(7, [Value::int(1), Value::int(2), Value::EMPTY]);
    assert_eq!(obj.tag(), 7);
    assert_eq!(obj.field_count(), 3);
    assert_eq!(obj.header().field_count(), 3);
    assert_eq!(obj.fields(), vec![Value::int(1), Value::int(2), Value::EMPTY]);

    let empty = ManagedObject::new(0, 0);
    assert_eq!(empty.field_count(), 0);
    assert!(empty.fields().is_empty());

    let filled = ManagedObject::filled(1, 4, Value::TRUE);
    assert!(filled.fields().iter().all(|v| *v == Value::TRUE));
}
