use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Serialize;

/// Last known position of one driver. Coordinates are stored as received.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub updated_at_ms: u64,
}

/// Owner tag for writes that do not come from a session.
const NO_SESSION: u64 = 0;

#[derive(Debug, Clone, Copy)]
struct Slot {
    record: LocationRecord,
    session_id: u64,
}

/// Location registry: `driver_id -> LocationRecord`, last value wins.
///
/// Each entry remembers which session wrote it last, so a session that
/// closes after the same driver reconnected elsewhere leaves the newer
/// session's entry alone.
///
/// Backed by a sharded map: writers for different drivers only contend when
/// their keys hash to the same shard, and no operation awaits while holding a
/// shard lock. Records are copied out under the lock, so a reader never sees
/// the latitude of one update paired with the longitude of another.
#[derive(Debug, Default)]
pub struct LocationRegistry {
    drivers: DashMap<String, Slot>,
}

impl LocationRegistry {
    pub fn new() -> Self {
        Self {
            drivers: DashMap::new(),
        }
    }

    /// Insert or overwrite the record for `driver_id`. Never fails.
    pub fn update_location(
        &self,
        driver_id: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> LocationRecord {
        self.update_for_session(driver_id, NO_SESSION, latitude, longitude)
    }

    /// `update_location` tagged with the writing session.
    pub fn update_for_session(
        &self,
        driver_id: &str,
        session_id: u64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> LocationRecord {
        let slot = Slot {
            record: LocationRecord {
                latitude,
                longitude,
                updated_at_ms: now_ms(),
            },
            session_id,
        };
        match self.drivers.get_mut(driver_id) {
            Some(mut existing) => *existing = slot,
            None => {
                self.drivers.insert(driver_id.to_string(), slot);
            }
        }
        slot.record
    }

    /// Delete the entry if present. Absent ids are a no-op.
    pub fn remove_driver(&self, driver_id: &str) -> Option<LocationRecord> {
        self.drivers.remove(driver_id).map(|(_, s)| s.record)
    }

    /// Delete the entry only if `session_id` wrote it last. Check and removal
    /// happen under one shard lock.
    pub fn remove_session(&self, driver_id: &str, session_id: u64) -> Option<LocationRecord> {
        self.drivers
            .remove_if(driver_id, |_, s| s.session_id == session_id)
            .map(|(_, s)| s.record)
    }

    pub fn get(&self, driver_id: &str) -> Option<LocationRecord> {
        self.drivers.get(driver_id).map(|r| r.value().record)
    }

    /// Snapshot of every driver, sorted by id. Consistent per record, not
    /// across records.
    pub fn get_all(&self) -> Vec<(String, LocationRecord)> {
        let mut all: Vec<(String, LocationRecord)> = self
            .drivers
            .iter()
            .map(|r| (r.key().clone(), r.value().record))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        self.drivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drivers.is_empty()
    }

    /// Bind cleanup for `driver_id` to the returned guard: dropping it runs
    /// the removal exactly once, whichever way the session ended. Only the
    /// entry written by `session_id` is removed.
    pub fn lease(self: &Arc<Self>, driver_id: &str, session_id: u64) -> DriverLease {
        DriverLease {
            registry: Arc::clone(self),
            driver_id: Arc::from(driver_id),
            session_id,
        }
    }
}

/// Guard owned by a session handler for the lifetime of its connection.
#[derive(Debug)]
pub struct DriverLease {
    registry: Arc<LocationRegistry>,
    driver_id: Arc<str>,
    session_id: u64,
}

impl DriverLease {
    pub fn driver_id(&self) -> &str {
        &self.driver_id
    }

    pub fn update(&self, latitude: Option<f64>, longitude: Option<f64>) -> LocationRecord {
        self.registry
            .update_for_session(&self.driver_id, self.session_id, latitude, longitude)
    }
}

impl Drop for DriverLease {
    fn drop(&mut self) {
        let removed = self.registry.remove_session(&self.driver_id, self.session_id);
        tracing::debug!(
            driver_id = %self.driver_id,
            session_id = self.session_id,
            had_entry = removed.is_some(),
            "registry entry released"
        );
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn update_then_get_returns_exact_values() {
        let reg = LocationRegistry::new();
        reg.update_location("d1", Some(12.9), Some(77.6));
        let r = reg.get("d1").unwrap();
        assert_eq!((r.latitude, r.longitude), (Some(12.9), Some(77.6)));

        reg.update_location("d1", Some(13.0), Some(77.7));
        let r = reg.get("d1").unwrap();
        assert_eq!((r.latitude, r.longitude), (Some(13.0), Some(77.7)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn out_of_range_and_missing_coordinates_are_stored_as_is() {
        let reg = LocationRegistry::new();
        reg.update_location("d1", Some(512.0), Some(-999.0));
        assert_eq!(reg.get("d1").unwrap().latitude, Some(512.0));

        reg.update_location("d2", None, None);
        let r = reg.get("d2").unwrap();
        assert_eq!((r.latitude, r.longitude), (None, None));
    }

    #[test]
    fn remove_is_idempotent() {
        let reg = LocationRegistry::new();
        assert!(reg.remove_driver("ghost").is_none());
        assert!(reg.is_empty());

        reg.update_location("d1", Some(1.0), Some(2.0));
        reg.update_location("d2", Some(3.0), Some(4.0));
        assert!(reg.remove_driver("d1").is_some());
        assert!(reg.remove_driver("d1").is_none());
        assert!(reg.get("d1").is_none());
        assert_eq!(reg.get("d2").unwrap().latitude, Some(3.0));
    }

    #[test]
    fn get_all_is_sorted_snapshot() {
        let reg = LocationRegistry::new();
        reg.update_location("b", Some(2.0), Some(2.0));
        reg.update_location("a", Some(1.0), Some(1.0));
        let ids: Vec<String> = reg.get_all().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn lease_drop_removes_entry_even_without_updates() {
        let reg = Arc::new(LocationRegistry::new());
        {
            let _lease = reg.lease("quiet", 1);
        }
        assert!(reg.is_empty());

        {
            let lease = reg.lease("busy", 2);
            lease.update(Some(12.9), Some(77.6));
            assert!(reg.get("busy").is_some());
        }
        assert!(reg.get("busy").is_none());
    }

    #[test]
    fn closing_old_session_keeps_newer_session_entry() {
        let reg = Arc::new(LocationRegistry::new());
        let old = reg.lease("d1", 1);
        old.update(Some(1.0), Some(2.0));

        let new = reg.lease("d1", 2);
        new.update(Some(5.0), Some(6.0));
        drop(old);

        let r = reg.get("d1").unwrap();
        assert_eq!((r.latitude, r.longitude), (Some(5.0), Some(6.0)));
        drop(new);
        assert!(reg.get("d1").is_none());
    }

    #[test]
    fn remove_session_ignores_other_writers() {
        let reg = LocationRegistry::new();
        reg.update_for_session("d1", 7, Some(1.0), Some(1.0));
        assert!(reg.remove_session("d1", 8).is_none());
        assert!(reg.remove_session("d1", 7).is_some());
        assert!(reg.remove_session("d1", 7).is_none());
    }

    #[test]
    fn concurrent_distinct_drivers_keep_their_own_last_value() {
        let reg = Arc::new(LocationRegistry::new());
        let drivers = 16;
        let updates = 500;

        thread::scope(|s| {
            for d in 0..drivers {
                let reg = Arc::clone(&reg);
                s.spawn(move || {
                    let id = format!("driver-{d}");
                    for i in 0..updates {
                        // lat and lon always move together so a torn record is detectable
                        let v = (d * updates + i) as f64;
                        reg.update_location(&id, Some(v), Some(-v));
                    }
                });
            }
            s.spawn(|| {
                for _ in 0..updates {
                    for (_, r) in reg.get_all() {
                        assert_eq!(r.latitude.map(|v| -v), r.longitude);
                    }
                }
            });
        });

        assert_eq!(reg.len(), drivers);
        for d in 0..drivers {
            let r = reg.get(&format!("driver-{d}")).unwrap();
            let last = (d * updates + updates - 1) as f64;
            assert_eq!((r.latitude, r.longitude), (Some(last), Some(-last)));
        }
    }
}
