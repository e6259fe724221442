/*!
 * Boundary Audit Trail
 * Records policy decisions taken at the sandbox boundary
 */

use super::decision::PolicyDecision;
use crate::value::Value;
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, TimestampSeconds};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Boundary operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Read,
    Write,
    Call,
    Enumerate,
}

/// Audit event severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditSeverity {
    Info,
    Warning,
    Critical,
}

/// What the policy decided
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum AuditOutcome {
    Allowed,
    Substituted,
    Denied(String),
    TimedOut,
}

impl AuditOutcome {
    pub fn is_denied(&self) -> bool {
        matches!(self, AuditOutcome::Denied(_) | AuditOutcome::TimedOut)
    }
}

impl From<&PolicyDecision> for AuditOutcome {
    fn from(decision: &PolicyDecision) -> Self {
        match decision {
            PolicyDecision::Allow => AuditOutcome::Allowed,
            PolicyDecision::Substitute(_) => AuditOutcome::Substituted,
            PolicyDecision::Deny(reason) => AuditOutcome::Denied(reason.clone()),
            PolicyDecision::TimedOut => AuditOutcome::TimedOut,
        }
    }
}

/// One recorded boundary decision
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditEvent {
    pub operation: Operation,
    /// Display form of the raw target
    pub target: String,
    pub key: Option<String>,
    pub outcome: AuditOutcome,
    pub severity: AuditSeverity,
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub logged_at: SystemTime,
}

impl AuditEvent {
    pub fn new(
        operation: Operation,
        target: &Value,
        key: Option<&Value>,
        decision: &PolicyDecision,
    ) -> Self {
        let outcome = AuditOutcome::from(decision);
        let severity = if !outcome.is_denied() {
            AuditSeverity::Info
        } else {
            // Denied invocations are more severe
            match operation {
                Operation::Call => AuditSeverity::Critical,
                _ => AuditSeverity::Warning,
            }
        };

        Self {
            operation,
            target: target.to_string(),
            key: key.map(ToString::to_string),
            outcome,
            severity,
            logged_at: SystemTime::now(),
        }
    }

    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }
}

/// Bounded audit logger
pub struct AuditLogger {
    /// Event log (ring buffer)
    events: RwLock<VecDeque<AuditEvent>>,
    capacity: usize,
    /// Denial counters per operation
    denial_counts: DashMap<Operation, u64, RandomState>,
    total: AtomicU64,
}

impl AuditLogger {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
            denial_counts: DashMap::with_hasher(RandomState::new()),
            total: AtomicU64::new(0),
        }
    }

    /// Log a boundary decision
    pub fn log(&self, event: AuditEvent) {
        self.total.fetch_add(1, Ordering::Relaxed);

        if event.outcome.is_denied() {
            self.denial_counts
                .entry(event.operation)
                .and_modify(|count| *count += 1)
                .or_insert(1);
        }

        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.write();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    /// Most recent events, newest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent denials, newest first
    pub fn denials(&self, limit: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        events
            .iter()
            .rev()
            .filter(|e| e.outcome.is_denied())
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn denial_count(&self, operation: Operation) -> u64 {
        self.denial_counts.get(&operation).map(|e| *e).unwrap_or(0)
    }

    /// Recent events as a JSON array, newest first
    pub fn export_json(&self, limit: usize) -> serde_json::Result<String> {
        serde_json::to_string(&self.recent(limit))
    }

    /// Clear all logs
    pub fn clear(&self) {
        self.events.write().clear();
        self.denial_counts.clear();
    }

    pub fn stats(&self) -> AuditStats {
        AuditStats {
            total_events: self.total.load(Ordering::Relaxed),
            retained_events: self.events.read().len(),
            total_denials: self.denial_counts.iter().map(|e| *e.value()).sum(),
        }
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new(crate::core::limits::DEFAULT_AUDIT_CAPACITY)
    }
}

/// Audit statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditStats {
    pub total_events: u64,
    pub retained_events: usize,
    pub total_denials: u64,
}
