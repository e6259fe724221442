/*!
 * Identity Tests
 * Stable proxy identity and round-trips across the boundary
 */

use crate::fixtures::{object, Part};
use membrane::{Function, PolicyHooks, Realm, Sandbox, Table, Value};
use pretty_assertions::assert_eq;

#[test]
fn test_same_proxy_per_object() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let raw = object(&part);

    let first = sandbox.wrap(&raw).unwrap();
    let second = sandbox.wrap(&raw).unwrap();

    assert!(first.as_proxy().unwrap().ptr_eq(second.as_proxy().unwrap()));
    assert_eq!(first, second);
    assert_eq!(sandbox.registry().len(), 1);
}

#[test]
fn test_round_trip_object() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let raw = object(&Part::new("Part"));

    let proxy = sandbox.wrap(&raw).unwrap();
    assert!(matches!(proxy, Value::Proxy(_)));
    assert!(sandbox.unwrap(&proxy).unwrap().same(&raw));
}

#[test]
fn test_wrap_is_idempotent() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let proxy = sandbox.wrap(&object(&Part::new("Part"))).unwrap();

    assert!(sandbox.wrap(&proxy).unwrap().same(&proxy));

    let table = sandbox.wrap(&Value::from(Table::from_pairs([("a", 1)]))).unwrap();
    assert!(sandbox.wrap(&table).unwrap().same(&table));
}

#[test]
fn test_table_keys_and_values_wrapped() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let raw = Table::new();
    raw.set("count", 3);
    raw.set("part", object(&part));
    raw.set(object(&part), "by-object");

    let wrapped = sandbox.wrap(&Value::from(raw.clone())).unwrap();
    let table = wrapped.as_table().unwrap();

    assert_eq!(table.len(), raw.len());
    assert_eq!(table.get("count"), Value::Int(3));

    let proxy = table.get("part");
    assert!(matches!(proxy, Value::Proxy(_)));
    // The same object used as a key maps to the same proxy
    assert_eq!(table.get(proxy.clone()), Value::str("by-object"));

    assert!(sandbox.unwrap(&wrapped).unwrap().same(&Value::from(raw)));
}

#[test]
fn test_host_function_wrapped() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let captured = object(&part);
    let getter = Function::new("GetSelf", move |_| Ok(vec![captured.clone()]));
    let raw = Value::from(getter);

    let wrapped = sandbox.wrap(&raw).unwrap();
    let function = wrapped.as_function().unwrap();
    assert_eq!(function.realm(), Realm::Sandbox);
    assert_eq!(function.name(), Some("GetSelf"));

    // Results never leak the raw object
    let results = sandbox.call(&wrapped, &[]).unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].same(&sandbox.wrap(&object(&part)).unwrap()));

    // Calling the wrapper directly goes through the same path
    let direct = function.invoke(&[]).unwrap();
    assert!(direct[0].same(&results[0]));

    assert!(sandbox.unwrap(&wrapped).unwrap().same(&raw));
}

#[test]
fn test_arguments_unwrapped_for_host() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let raw_part = object(&part);
    let expected = raw_part.clone();
    let check = Function::new("IsRaw", move |args| {
        Ok(vec![Value::Bool(args.first().is_some_and(|a| a.same(&expected)))])
    });

    let wrapped = sandbox.wrap(&Value::from(check)).unwrap();
    let proxy = sandbox.wrap(&raw_part).unwrap();
    let results = sandbox.call(&wrapped, &[proxy]).unwrap();
    assert_eq!(results, vec![Value::Bool(true)]);
}

#[test]
fn test_separate_sandboxes_separate_proxies() {
    let first = Sandbox::new(PolicyHooks::new());
    let second = Sandbox::new(PolicyHooks::new());
    let raw = object(&Part::new("Part"));

    let a = first.wrap(&raw).unwrap();
    let b = second.wrap(&raw).unwrap();
    assert!(!a.same(&b));
    assert!(first.registry().is_proxy(&a));
    assert!(!second.registry().is_proxy(&a));
}
