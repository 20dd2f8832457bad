//! Minimal metrics registry for the gateway.
//!
//! Counter/gauge types with dynamic labels backed by `DashMap`. Labels are
//! flattened into sorted key vectors to keep deterministic ordering.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn write_sample(out: &mut String, name: &str, key: &[(String, String)], val: impl std::fmt::Display) {
    if key.is_empty() {
        let _ = writeln!(out, "{name} {val}");
        return;
    }
    let label_str = key
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",");
    let _ = writeln!(out, "{name}{{{label_str}}} {val}");
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            write_sample(out, name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<Vec<(String, String)>, AtomicI64>,
}

impl GaugeVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    /// Decrement by 1.
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    /// Add an arbitrary signed delta.
    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Render in Prometheus text exposition format.
    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for r in self.map.iter() {
            write_sample(out, name, r.key(), r.value().load(Ordering::Relaxed));
        }
    }
}

#[derive(Default)]
pub struct DriverTrackMetrics {
    pub ws_upgrades: CounterVec,
    pub auth_rejections: CounterVec,
    pub location_updates: CounterVec,
    pub malformed_payloads: CounterVec,
    pub sessions_closed: CounterVec,
    pub sessions_active: GaugeVec,
    draining: AtomicBool,
}

impl DriverTrackMetrics {
    /// Mark draining state.
    pub fn set_draining(&self) { self.draining.store(true, Ordering::Relaxed); }
    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool { self.draining.load(Ordering::Relaxed) }

    /// Render all registered metrics plus any extra lines provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.ws_upgrades.render("drivertrack_ws_upgrades_total", &mut out);
        self.auth_rejections.render("drivertrack_auth_rejections_total", &mut out);
        self.location_updates.render("drivertrack_location_updates_total", &mut out);
        self.malformed_payloads.render("drivertrack_malformed_payloads_total", &mut out);
        self.sessions_closed.render("drivertrack_sessions_closed_total", &mut out);
        self.sessions_active.render("drivertrack_sessions_active", &mut out);

        let _ = writeln!(
            out,
            "# TYPE drivertrack_draining gauge\ndrivertrack_draining {}",
            if self.is_draining() { 1 } else { 0 }
        );
        for (k, v) in extra { let _ = writeln!(out, "{} {}", k, v); }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_labelled_and_bare_samples() {
        let m = DriverTrackMetrics::default();
        m.auth_rejections.inc(&[("reason", "missing_token")]);
        m.auth_rejections.inc(&[("reason", "missing_token")]);
        m.location_updates.inc(&[]);
        m.sessions_active.inc(&[]);
        m.sessions_active.dec(&[]);

        let out = m.render(&[("drivertrack_registry_drivers", 3)]);
        assert!(out.contains("drivertrack_auth_rejections_total{reason=\"missing_token\"} 2"));
        assert!(out.contains("drivertrack_location_updates_total 1"));
        assert!(out.contains("drivertrack_sessions_active 0"));
        assert!(out.contains("drivertrack_draining 0"));
        assert!(out.contains("drivertrack_registry_drivers 3"));
    }

    #[test]
    fn label_order_does_not_split_series() {
        let c = CounterVec::default();
        c.inc(&[("a", "1"), ("b", "2")]);
        c.inc(&[("b", "2"), ("a", "1")]);
        assert_eq!(c.get(&[("a", "1"), ("b", "2")]), 2);
    }

    #[test]
    fn escapes_label_values() {
        assert_eq!(escape_label("a\"b\\c\nd"), "a\\\"b\\\\c\\nd");
    }
}
