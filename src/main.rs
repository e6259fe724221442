/*!
 * Membrane Demo
 *
 * Wraps a small host object tree and drives it the way guest code would:
 * - Reads through a proxy
 * - A blocked destructive write
 * - Filtered enumeration
 * - Registry and audit statistics
 */

use membrane::{
    init_tracing, HostObject, MembraneError, MembraneResult, Object, PolicyDecision, PolicyHooks,
    Sandbox, SandboxConfig, Value,
};
use parking_lot::RwLock;
use std::error::Error;
use tracing::info;

/// Host node with a name and children
struct Node {
    class: &'static str,
    name: RwLock<String>,
    children: Vec<Object>,
}

fn node(class: &'static str, name: &str, children: Vec<Object>) -> Object {
    Object::new(Node {
        class,
        name: RwLock::new(name.to_string()),
        children,
    })
}

fn name_of(object: &Object) -> MembraneResult<Value> {
    object.host().get(&Value::str("Name"))
}

impl HostObject for Node {
    fn class_name(&self) -> &str {
        self.class
    }

    fn get(&self, key: &Value) -> MembraneResult<Value> {
        match key.as_str() {
            Some("Name") => Ok(Value::str(self.name.read().as_str())),
            Some("ClassName") => Ok(Value::str(self.class)),
            Some(_) => {
                for child in &self.children {
                    if name_of(child)? == *key {
                        return Ok(Value::Object(child.clone()));
                    }
                }
                Ok(Value::Nil)
            }
            None => Ok(Value::Nil),
        }
    }

    fn set(&self, key: &Value, value: Value) -> MembraneResult<()> {
        match (key.as_str(), value.as_str()) {
            (Some("Name"), Some(name)) => {
                *self.name.write() = name.to_string();
                Ok(())
            }
            _ => Err(MembraneError::host(format!("{} is read-only", key))),
        }
    }

    fn members(&self) -> MembraneResult<Vec<Value>> {
        let mut members = vec![Value::str("Name"), Value::str("ClassName")];
        for child in &self.children {
            members.push(name_of(child)?);
        }
        Ok(members)
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let workspace = node(
        "Workspace",
        "Workspace",
        vec![
            node("Part", "Baseplate", Vec::new()),
            node("Script", "_Internal", Vec::new()),
        ],
    );

    let hooks = PolicyHooks::new()
        .on_write(|_object, key, _value| match key.as_str() {
            Some("Destroy") => PolicyDecision::deny("destroy is not available to guest code"),
            _ => PolicyDecision::Allow,
        })
        .on_enumerate(|_object, key| !key.as_str().is_some_and(|k| k.starts_with('_')));

    let sandbox = Sandbox::builder()
        .hooks(hooks)
        .config(SandboxConfig::from_env().with_audit(true))
        .build();

    let proxy = sandbox.wrap(&Value::Object(workspace.clone()))?;
    info!(proxy = %proxy, "Workspace wrapped");

    let name = sandbox.read(&proxy, &"Name".into())?;
    info!(name = %name, "Read through proxy");

    match sandbox.write(&proxy, &"Destroy".into(), &Value::Bool(true)) {
        Err(e) if e.is_denial() => info!(error = %e, "Destructive write blocked"),
        other => other?,
    }

    for (key, value) in sandbox.enumerate(&proxy)? {
        info!(key = %key, value = %value, "Visible member");
    }

    let again = sandbox.wrap(&Value::Object(workspace))?;
    info!(same = again.same(&proxy), "Wrapped twice");

    info!(stats = ?sandbox.registry().stats(), "Registry");
    if let Some(audit) = sandbox.audit() {
        info!(stats = ?audit.stats(), "Audit");
        println!("{}", audit.export_json(10)?);
    }

    Ok(())
}
