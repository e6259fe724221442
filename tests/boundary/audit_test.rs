/*!
 * Audit Trail Tests
 */

use crate::fixtures::{folder, object, Part};
use membrane::policy::{AuditOutcome, AuditSeverity};
use membrane::{Function, Operation, PolicyDecision, PolicyHooks, Sandbox, SandboxConfig, Value};
use pretty_assertions::assert_eq;

fn audited(hooks: PolicyHooks) -> Sandbox {
    Sandbox::builder()
        .hooks(hooks)
        .config(SandboxConfig::default().with_audit(true))
        .build()
}

#[test]
fn test_decisions_recorded() {
    let sandbox = audited(PolicyHooks::new().on_write(|_, key, _| {
        if key.as_str() == Some("Destroy") {
            PolicyDecision::deny("blocked")
        } else {
            PolicyDecision::Allow
        }
    }));
    let part = Part::new("Part").with("Name", "Baseplate");
    let proxy = sandbox.wrap(&object(&part)).unwrap();

    sandbox.read(&proxy, &"Name".into()).unwrap();
    let _ = sandbox.write(&proxy, &"Destroy".into(), &Value::Bool(true));

    let audit = sandbox.audit().unwrap();
    let recent = audit.recent(10);
    assert_eq!(recent.len(), 2);

    let denial = &recent[0];
    assert_eq!(denial.operation, Operation::Write);
    assert_eq!(denial.target, "Part");
    assert_eq!(denial.key.as_deref(), Some("Destroy"));
    assert_eq!(denial.outcome, AuditOutcome::Denied("blocked".to_string()));
    assert_eq!(denial.severity, AuditSeverity::Warning);

    assert_eq!(recent[1].outcome, AuditOutcome::Allowed);
    assert_eq!(audit.denial_count(Operation::Write), 1);
}

#[test]
fn test_filtered_members_recorded() {
    let sandbox = audited(PolicyHooks::new().on_enumerate(|_, key| key.as_str() != Some("Hidden")));
    let (raw, _children) = folder(&["Visible", "Hidden"]);
    let proxy = sandbox.wrap(&object(&raw)).unwrap();

    assert_eq!(sandbox.enumerate(&proxy).unwrap().len(), 1);

    let audit = sandbox.audit().unwrap();
    let denials = audit.denials(10);
    assert_eq!(denials.len(), 1);
    assert_eq!(denials[0].operation, Operation::Enumerate);
    assert_eq!(denials[0].key.as_deref(), Some("Hidden"));
}

#[test]
fn test_denied_call_is_critical() {
    let sandbox = audited(PolicyHooks::new().on_call(|_, _| PolicyDecision::deny("no calls")));
    let wrapped = sandbox
        .wrap(&Value::from(Function::new("Shutdown", |_| Ok(vec![]))))
        .unwrap();

    assert!(sandbox.call(&wrapped, &[]).is_err());

    let events = sandbox.audit().unwrap().recent(1);
    assert_eq!(events[0].operation, Operation::Call);
    assert_eq!(events[0].severity, AuditSeverity::Critical);
    assert_eq!(events[0].target, "function: Shutdown");
}

#[test]
fn test_audit_disabled_by_default() {
    let sandbox = Sandbox::new(PolicyHooks::new());
    let proxy = sandbox.wrap(&object(&Part::new("Part"))).unwrap();
    sandbox.read(&proxy, &"Name".into()).unwrap();
    assert!(sandbox.audit().is_none());
}
