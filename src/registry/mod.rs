/*!
 * Identity Registry
 * Bidirectional weak mapping between raw host values and their sandbox counterparts
 *
 * ## Design
 * - Two independent indices (raw -> entry, proxy -> entry), both `DashMap`
 * - Entries hold weak handles on both sides and never extend a lifetime
 * - Lookups are lock-free reads; registration is serialized by a single mutex
 *   so at most one proxy exists per raw value, even under races
 * - Dead entries are treated as absent on lookup and pruned by sweeps
 *
 * ## Usage
 * ```ignore
 * let registry = IdentityRegistry::new();
 * let raw = Value::from(Table::new());
 * let first = registry.register(&raw, || Value::from(Table::with_realm(Realm::Sandbox)));
 * let second = registry.register(&raw, || unreachable!());
 * assert!(first.created && !second.created);
 * assert_eq!(first.value, second.value);
 * ```
 */

mod weak;

use crate::core::id::ValueId;
use crate::core::limits::{DEFAULT_SWEEP_INTERVAL, REGISTRY_INITIAL_CAPACITY};
use crate::sandbox::ProxyState;
use crate::value::Value;
use ahash::RandomState;
use dashmap::DashMap;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use weak::{upgrade_matching, Entry};

/// Outcome of a registration
#[derive(Debug, Clone)]
pub struct Registration {
    /// The counterpart now associated with the registered value
    pub value: Value,
    /// False when an existing association was returned
    pub created: bool,
}

/// Registry statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryStats {
    /// Indexed associations, including ones awaiting a sweep
    pub entries: usize,
    /// Associations whose two sides are both alive
    pub live: usize,
    pub registrations: u64,
    pub reuses: u64,
    pub pruned: u64,
}

/// Which index a lookup starts from
#[derive(Debug, Clone, Copy)]
enum Side {
    Raw,
    Proxy,
}

/// Weak bidirectional identity map
pub struct IdentityRegistry {
    by_raw: DashMap<ValueId, Entry, RandomState>,
    by_proxy: DashMap<ValueId, Entry, RandomState>,
    write_lock: Mutex<()>,
    sweep_interval: u64,
    registrations: AtomicU64,
    reuses: AtomicU64,
    pruned: AtomicU64,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    /// Create a registry that sweeps after every `interval` registrations.
    /// An interval of 0 disables automatic sweeps.
    pub fn with_sweep_interval(interval: u64) -> Self {
        Self {
            by_raw: DashMap::with_capacity_and_hasher(REGISTRY_INITIAL_CAPACITY, RandomState::new()),
            by_proxy: DashMap::with_capacity_and_hasher(
                REGISTRY_INITIAL_CAPACITY,
                RandomState::new(),
            ),
            write_lock: Mutex::new(()),
            sweep_interval: interval,
            registrations: AtomicU64::new(0),
            reuses: AtomicU64::new(0),
            pruned: AtomicU64::new(0),
        }
    }

    /// Return the proxy registered for `raw`, creating it with `make_proxy` if absent
    ///
    /// `make_proxy` runs while registration is serialized; it must only build
    /// an empty counterpart and must not call back into the registry.
    /// Scalars are returned unchanged and never registered.
    pub fn register(&self, raw: &Value, make_proxy: impl FnOnce() -> Value) -> Registration {
        self.link(Side::Raw, raw, make_proxy)
    }

    /// Return the raw value registered for `proxy`, creating it with `make_raw` if absent
    ///
    /// This is the unwrap direction: a value born inside the sandbox gets a
    /// host-side mirror.
    pub fn register_mirror(&self, proxy: &Value, make_raw: impl FnOnce() -> Value) -> Registration {
        self.link(Side::Proxy, proxy, make_raw)
    }

    /// Proxy registered for a raw value
    pub fn proxy_of(&self, raw: &Value) -> Option<Value> {
        self.lookup(Side::Raw, raw)
    }

    /// Raw value registered for a proxy
    pub fn raw_of(&self, proxy: &Value) -> Option<Value> {
        self.lookup(Side::Proxy, proxy)
    }

    /// True if `value` is the raw side of a live association
    pub fn is_raw(&self, value: &Value) -> bool {
        self.proxy_of(value).is_some()
    }

    /// True if `value` is the proxy side of a live association
    pub fn is_proxy(&self, value: &Value) -> bool {
        self.raw_of(value).is_some()
    }

    /// Lifecycle state of the proxy registered for `raw`
    ///
    /// `None` when no association is indexed. `Collected` when the proxy side
    /// has been reclaimed but the entry has not been swept yet.
    pub fn state_of(&self, raw: &Value) -> Option<ProxyState> {
        let id = raw.id()?;
        let entry = self.by_raw.get(&id).map(|e| e.clone())?;
        match entry.proxy.upgrade() {
            Some(Value::Proxy(handle)) => Some(handle.state()),
            Some(_) => Some(ProxyState::Bound),
            None => Some(ProxyState::Collected),
        }
    }

    /// Drop the association in which `value` takes part, on either side
    pub fn forget(&self, value: &Value) -> bool {
        let Some(id) = value.id() else {
            return false;
        };
        let _guard = self.write_lock.lock();
        if let Some((_, entry)) = self.by_raw.remove(&id) {
            self.by_proxy.remove_if(&entry.proxy_id, |_, e| e.raw_id == id);
            trace!("Forgot association for raw {}", id);
            return true;
        }
        if let Some((_, entry)) = self.by_proxy.remove(&id) {
            self.by_raw.remove_if(&entry.raw_id, |_, e| e.proxy_id == id);
            trace!("Forgot association for proxy {}", id);
            return true;
        }
        false
    }

    /// Prune associations with a reclaimed side, returning how many were removed
    pub fn sweep(&self) -> usize {
        let _guard = self.write_lock.lock();
        self.sweep_locked()
    }

    /// Remove every association
    pub fn clear(&self) {
        let _guard = self.write_lock.lock();
        self.by_raw.clear();
        self.by_proxy.clear();
    }

    /// Indexed associations, including ones awaiting a sweep
    pub fn len(&self) -> usize {
        self.by_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_raw.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            entries: self.by_raw.len(),
            live: self.by_raw.iter().filter(|e| e.value().is_alive()).count(),
            registrations: self.registrations.load(Ordering::Relaxed),
            reuses: self.reuses.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }

    fn index(&self, side: Side) -> &DashMap<ValueId, Entry, RandomState> {
        match side {
            Side::Raw => &self.by_raw,
            Side::Proxy => &self.by_proxy,
        }
    }

    fn lookup(&self, side: Side, known: &Value) -> Option<Value> {
        let id = known.id()?;
        // Clone out so no shard lock is held while upgrading
        let entry = self.index(side).get(&id).map(|e| e.clone())?;
        match side {
            Side::Raw => upgrade_matching(&entry.proxy, entry.proxy_id),
            Side::Proxy => upgrade_matching(&entry.raw, entry.raw_id),
        }
    }

    fn link(&self, side: Side, known: &Value, make: impl FnOnce() -> Value) -> Registration {
        if known.id().is_none() {
            return Registration {
                value: known.clone(),
                created: false,
            };
        }

        let _guard = self.write_lock.lock();

        if let Some(existing) = self.lookup(side, known) {
            self.reuses.fetch_add(1, Ordering::Relaxed);
            return Registration {
                value: existing,
                created: false,
            };
        }

        let counterpart = make();
        let (raw, proxy) = match side {
            Side::Raw => (known, &counterpart),
            Side::Proxy => (&counterpart, known),
        };

        let Some(entry) = Entry::new(raw, proxy) else {
            warn!(
                "Counterpart for {} is not a reference value, association not recorded",
                known.type_name()
            );
            return Registration {
                value: counterpart,
                created: true,
            };
        };

        self.evict(entry.raw_id, entry.proxy_id);
        debug!(
            "Registered {} {} <-> {} {}",
            raw.type_name(),
            entry.raw_id,
            proxy.type_name(),
            entry.proxy_id
        );
        self.by_raw.insert(entry.raw_id, entry.clone());
        self.by_proxy.insert(entry.proxy_id, entry);

        if let Value::Proxy(handle) = proxy {
            handle.bind();
        }

        let count = self.registrations.fetch_add(1, Ordering::Relaxed) + 1;
        if self.sweep_interval > 0 && count % self.sweep_interval == 0 {
            self.sweep_locked();
        }

        Registration {
            value: counterpart,
            created: true,
        }
    }

    /// Remove stale associations occupying either id
    fn evict(&self, raw_id: ValueId, proxy_id: ValueId) {
        if let Some((_, old)) = self.by_raw.remove(&raw_id) {
            self.by_proxy.remove_if(&old.proxy_id, |_, e| e.raw_id == raw_id);
        }
        if let Some((_, old)) = self.by_proxy.remove(&proxy_id) {
            self.by_raw.remove_if(&old.raw_id, |_, e| e.proxy_id == proxy_id);
        }
    }

    fn sweep_locked(&self) -> usize {
        let before = self.by_raw.len();
        self.by_raw.retain(|_, e| e.is_alive());
        self.by_proxy.retain(|_, e| e.is_alive());
        let removed = before.saturating_sub(self.by_raw.len());
        if removed > 0 {
            self.pruned.fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Registry sweep pruned {} associations", removed);
        }
        removed
    }
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
