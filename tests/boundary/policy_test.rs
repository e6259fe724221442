/*!
 * Policy Enforcement Tests
 */

use crate::fixtures::{folder, object, Echo, Part, Spawner};
use membrane::{
    Function, MemberBlocklist, MembraneError, Object, PolicyChain, PolicyDecision, PolicyHooks,
    Sandbox, SandboxConfig, Table, Value,
};
use membrane::core::errors::POLICY_TIMEOUT_REASON;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn deny_destroy() -> PolicyHooks {
    PolicyHooks::new().on_write(|_object, key, _value| {
        if key.as_str() == Some("Destroy") {
            PolicyDecision::deny("destroy is not available")
        } else {
            PolicyDecision::Allow
        }
    })
}

#[test]
fn test_denied_write_leaves_object_unchanged() {
    let sandbox = Sandbox::new(deny_destroy());
    let part = Part::new("Part").with("Name", "Baseplate");
    let proxy = sandbox.wrap(&object(&part)).unwrap();
    let before = part.snapshot();
    let writes = part.writes();

    for attempt in [Value::Bool(true), Value::Int(1), Value::Nil, proxy.clone()] {
        let err = sandbox
            .write(&proxy, &"Destroy".into(), &attempt)
            .unwrap_err();
        match err {
            MembraneError::WriteDenied { key, reason } => {
                assert_eq!(key, "Destroy");
                assert_eq!(reason, "destroy is not available");
            }
            other => panic!("expected WriteDenied, got {:?}", other),
        }
    }

    assert_eq!(part.snapshot(), before);
    assert_eq!(part.writes(), writes);
}

#[test]
fn test_allowed_write_reaches_host() {
    let sandbox = Sandbox::new(deny_destroy());
    let part = Part::new("Part");
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    sandbox.write(&proxy, &"Name".into(), &"Renamed".into()).unwrap();
    assert_eq!(part.prop("Name"), Value::str("Renamed"));
    assert_eq!(sandbox.read(&proxy, &"Name".into()).unwrap(), Value::str("Renamed"));
}

#[test]
fn test_written_proxy_stored_raw() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let other = Part::new("Part");
    let proxy = sandbox.wrap(&object(&part)).unwrap();
    let other_proxy = sandbox.wrap(&object(&other)).unwrap();

    sandbox.write(&proxy, &"Link".into(), &other_proxy).unwrap();
    assert!(part.prop("Link").same(&object(&other)));

    // And comes back as the same proxy
    assert!(sandbox.read(&proxy, &"Link".into()).unwrap().same(&other_proxy));
}

#[test]
fn test_enumerate_filters_by_prefix() {
    let hooks = PolicyHooks::new()
        .on_enumerate(|_object, key| !key.as_str().is_some_and(|k| k.starts_with("Hidden")));
    let sandbox = Sandbox::new(hooks);
    let (raw, _children) = folder(&["Alpha", "HiddenBeta", "Gamma", "HiddenDelta"]);
    let proxy = sandbox.wrap(&object(&raw)).unwrap();

    let entries = sandbox.enumerate(&proxy).unwrap();
    let keys: Vec<Value> = entries.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, vec![Value::str("Alpha"), Value::str("Gamma")]);

    for (key, value) in &entries {
        let handle = value.as_proxy().expect("members are proxied");
        assert!(handle.is_bound());
        assert_eq!(handle.class_name(), "Part");
        assert_eq!(sandbox.read(value, &"Name".into()).unwrap(), *key);
    }
}

#[test]
fn test_read_denied_and_substituted() {
    let hooks = PolicyHooks::new().on_read(|_object, key| match key.as_str() {
        Some("Secret") => PolicyDecision::deny("hidden"),
        Some("Health") => PolicyDecision::substitute(100),
        Some("Slow") => PolicyDecision::TimedOut,
        _ => PolicyDecision::Allow,
    });
    let sandbox = Sandbox::new(hooks);
    let part = Part::new("Part").with("Secret", "hunter2").with("Health", 5);
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    assert!(matches!(
        sandbox.read(&proxy, &"Secret".into()),
        Err(MembraneError::AccessDenied { .. })
    ));
    assert_eq!(sandbox.read(&proxy, &"Health".into()).unwrap(), Value::Int(100));

    match sandbox.read(&proxy, &"Slow".into()) {
        Err(MembraneError::AccessDenied { reason, .. }) => {
            assert_eq!(reason, POLICY_TIMEOUT_REASON)
        }
        other => panic!("expected timeout denial, got {:?}", other),
    }
}

#[test]
fn test_enumerate_applies_read_hook() {
    let hooks = PolicyHooks::new().on_read(|_object, key| match key.as_str() {
        Some("Secret") => PolicyDecision::deny("hidden"),
        Some("Health") => PolicyDecision::substitute(100),
        Some("Slow") => PolicyDecision::TimedOut,
        _ => PolicyDecision::Allow,
    });
    let sandbox = Sandbox::builder()
        .hooks(hooks)
        .config(SandboxConfig::default().with_audit(true))
        .build();
    let part = Part::new("Part")
        .with("Name", "Vault")
        .with("Secret", "hunter2")
        .with("Health", 5)
        .with("Slow", 1);
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    let entries = sandbox.enumerate(&proxy).unwrap();
    assert_eq!(
        entries,
        vec![
            (Value::str("Name"), Value::str("Vault")),
            (Value::str("Health"), Value::Int(100)),
        ]
    );
    assert!(entries.iter().all(|(_, v)| v.as_str() != Some("hunter2")));

    let denied: Vec<String> = sandbox
        .audit()
        .unwrap()
        .denials(16)
        .into_iter()
        .filter_map(|event| event.key)
        .collect();
    assert!(denied.contains(&"Secret".to_string()));
    assert!(denied.contains(&"Slow".to_string()));
}

#[test]
fn test_host_table_filtered_on_wrap() {
    let hooks = PolicyHooks::new()
        .on_enumerate(|_object, key| !key.as_str().is_some_and(|k| k.starts_with("Hidden")))
        .on_read(|_object, key| {
            if key.as_str() == Some("Secret") {
                PolicyDecision::deny("hidden")
            } else {
                PolicyDecision::Allow
            }
        });
    let sandbox = Sandbox::new(hooks);
    let raw = Table::from_pairs([
        ("Alpha", Value::Int(1)),
        ("HiddenBeta", Value::Int(2)),
        ("Gamma", Value::Int(3)),
        ("HiddenDelta", Value::Int(4)),
    ]);
    let wrapped = sandbox.wrap(&Value::from(raw.clone())).unwrap();

    let keys: Vec<Value> = sandbox
        .enumerate(&wrapped)
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![Value::str("Alpha"), Value::str("Gamma")]);
    assert_eq!(sandbox.read(&wrapped, &"HiddenBeta".into()).unwrap(), Value::Nil);

    let nested = Table::from_pairs([("Secret", "hunter2"), ("Public", "ok")]);
    let holder = Table::from_pairs([("inner", nested)]);
    let wrapped = sandbox.wrap(&Value::from(holder)).unwrap();
    let inner = sandbox.read(&wrapped, &"inner".into()).unwrap();
    assert_eq!(sandbox.read(&inner, &"Secret".into()).unwrap(), Value::Nil);
    assert_eq!(sandbox.read(&inner, &"Public".into()).unwrap(), Value::str("ok"));
}

#[test]
fn test_policy_applies_to_fresh_host_objects() {
    let hooks = PolicyHooks::new().on_write(|_object, key, _value| {
        if key.as_str() == Some("Name") {
            PolicyDecision::deny("names are fixed")
        } else {
            PolicyDecision::Allow
        }
    });
    let sandbox = Sandbox::new(hooks);
    let spawner = sandbox.wrap(&Value::Object(Object::new(Spawner))).unwrap();

    let spawned = sandbox.call(&spawner, &[Value::str("Fresh")]).unwrap();
    assert_eq!(sandbox.read(&spawned[0], &"Name".into()).unwrap(), Value::str("Fresh"));
    assert!(matches!(
        sandbox.write(&spawned[0], &"Name".into(), &"Renamed".into()),
        Err(MembraneError::WriteDenied { .. })
    ));
}

#[test]
fn test_hooks_see_raw_values() {
    let saw_proxy = Arc::new(AtomicBool::new(false));
    let flag = saw_proxy.clone();
    let hooks = PolicyHooks::new()
        .on_write(move |object, _key, value| {
            if matches!(object, Value::Proxy(_)) || matches!(value, Value::Proxy(_)) {
                flag.store(true, Ordering::SeqCst);
            }
            PolicyDecision::Allow
        });
    let sandbox = Sandbox::new(hooks);
    let part = Part::new("Part");
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    sandbox.write(&proxy, &"Self".into(), &proxy).unwrap();
    assert!(!saw_proxy.load(Ordering::SeqCst));
}

#[test]
fn test_call_policy() {
    let hooks = PolicyHooks::new().on_call(|callee, args| {
        match callee.as_function().and_then(|f| f.name()) {
            Some("Shutdown") => PolicyDecision::deny("not for guests"),
            Some("Roll") => PolicyDecision::substitute(4),
            _ if args.len() > 2 => PolicyDecision::deny("too many arguments"),
            _ => PolicyDecision::Allow,
        }
    });
    let sandbox = Sandbox::new(hooks);

    let shutdown = sandbox
        .wrap(&Value::from(Function::new("Shutdown", |_| Ok(vec![]))))
        .unwrap();
    let err = sandbox.call(&shutdown, &[]).unwrap_err();
    assert!(matches!(err, MembraneError::CallDenied { .. }));
    assert!(err.is_denial());

    let roll = sandbox
        .wrap(&Value::from(Function::new("Roll", |_| Ok(vec![Value::Int(6)]))))
        .unwrap();
    assert_eq!(sandbox.call(&roll, &[]).unwrap(), vec![Value::Int(4)]);

    let echo = sandbox.wrap(&Value::Object(Object::new(Echo))).unwrap();
    assert_eq!(
        sandbox.call(&echo, &[Value::Int(1), Value::Int(2)]).unwrap(),
        vec![Value::Int(1), Value::Int(2)]
    );
    assert!(matches!(
        sandbox.call(&echo, &[Value::Nil, Value::Nil, Value::Nil]),
        Err(MembraneError::CallDenied { .. })
    ));
}

#[test]
fn test_guest_functions_skip_policy() {
    let sandbox = Sandbox::new(PolicyHooks::new().on_call(|_, _| PolicyDecision::deny("no")));
    let local = sandbox.new_function("local", |args| Ok(args.to_vec()));
    assert_eq!(
        sandbox.call(&Value::from(local), &[Value::Int(9)]).unwrap(),
        vec![Value::Int(9)]
    );
}

#[test]
fn test_raised_payload_is_wrapped() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let part = Part::new("Part");
    let payload = object(&part);
    let thrower = Function::new("Throw", move |_| Err(MembraneError::Raised(payload.clone())));
    let wrapped = sandbox.wrap(&Value::from(thrower)).unwrap();

    match sandbox.call(&wrapped, &[]) {
        Err(MembraneError::Raised(value)) => {
            assert!(matches!(value, Value::Proxy(_)));
            assert!(sandbox.unwrap(&value).unwrap().same(&object(&part)));
        }
        other => panic!("expected raised fault, got {:?}", other),
    }

    // Faults raised by host getters are wrapped the same way
    let proxy = sandbox.wrap(&object(&part)).unwrap();
    assert!(matches!(
        sandbox.read(&proxy, &"Explode".into()),
        Err(MembraneError::Raised(Value::Str(_)))
    ));
}

#[test]
fn test_blocklist_chain() {
    let chain = PolicyChain::new()
        .with(MemberBlocklist::new(["destroy", "getchildren"]))
        .with(PolicyHooks::new().on_read(|_, key| {
            if key.as_str() == Some("Name") {
                PolicyDecision::substitute("anonymous")
            } else {
                PolicyDecision::Allow
            }
        }));
    let sandbox = Sandbox::with_policy(chain, Default::default());
    let part = Part::new("Part")
        .with("Name", "Baseplate")
        .with("GetChildren", 0)
        .with("Color", "red");
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    assert!(matches!(
        sandbox.write(&proxy, &"DESTROY".into(), &Value::Bool(true)),
        Err(MembraneError::WriteDenied { .. })
    ));
    assert_eq!(sandbox.read(&proxy, &"Name".into()).unwrap(), Value::str("anonymous"));

    let keys: Vec<Value> = sandbox
        .enumerate(&proxy)
        .unwrap()
        .into_iter()
        .map(|(k, _)| k)
        .collect();
    assert_eq!(keys, vec![Value::str("Name"), Value::str("Color")]);
}
