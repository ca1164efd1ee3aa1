//! Calibration record hand-off.
//!
//! The finished [`CalibrationRecord`] is stored as a single JSON document
//! under one key.  The object-placement engine reads the same key to
//! enumerate usable surfaces.

use roomscan_types::CalibrationRecord;
use tracing::{debug, info};

use crate::store::{KeyValueStore, StoreError};

/// Serialise `record` and write it under `key`.
pub fn save_calibration(
    store: &dyn KeyValueStore,
    key: &str,
    record: &CalibrationRecord,
) -> Result<(), StoreError> {
    let json = serde_json::to_string(record)?;
    store.write(key, &json)?;
    info!(
        key,
        surfaces = record.surfaces.len(),
        coverage = record.scan_coverage,
        "calibration record saved"
    );
    Ok(())
}

/// Read and decode the record stored under `key`.
///
/// Returns `Ok(None)` when no calibration has been stored yet.
pub fn load_calibration(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<CalibrationRecord>, StoreError> {
    let Some(json) = store.read(key)? else {
        debug!(key, "no calibration record stored");
        return Ok(None);
    };
    Ok(Some(serde_json::from_str(&json)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, SqliteStore};
    use roomscan_types::{Surface, SurfaceType, Vec3};
    use uuid::Uuid;

    fn sample_record() -> CalibrationRecord {
        let mut wall = Surface::new(0, Vec3::new(3.0, 1.2, 0.5), Vec3::new(-1.0, 0.0, 0.0), SurfaceType::Wall);
        wall.is_visible = true;
        let table = Surface::new(1, Vec3::new(-1.5, 1.05, 1.5), Vec3::up(), SurfaceType::Table);
        CalibrationRecord::new(Uuid::new_v4(), &[wall, table], Vec3::new(0.0, 1.6, 0.0), 0.83)
    }

    #[test]
    fn load_before_save_is_none() {
        let store = InMemoryStore::new();
        assert!(load_calibration(&store, "RoomCalibration").unwrap().is_none());
    }

    #[test]
    fn saved_record_loads_back_identically() {
        let store = SqliteStore::open_in_memory().unwrap();
        let record = sample_record();
        save_calibration(&store, "RoomCalibration", &record).unwrap();

        let loaded = load_calibration(&store, "RoomCalibration").unwrap().unwrap();
        assert_eq!(loaded, record);
        assert_eq!(loaded.visible_surfaces().count(), 1);
    }

    #[test]
    fn second_save_overwrites_first() {
        let store = InMemoryStore::new();
        let first = sample_record();
        let mut second = sample_record();
        second.surfaces.truncate(1);
        save_calibration(&store, "RoomCalibration", &first).unwrap();
        save_calibration(&store, "RoomCalibration", &second).unwrap();

        let loaded = load_calibration(&store, "RoomCalibration").unwrap().unwrap();
        assert_eq!(loaded.session_id, second.session_id);
        assert_eq!(loaded.surfaces.len(), 1);
    }

    #[test]
    fn corrupt_payload_is_a_json_error() {
        let store = InMemoryStore::new();
        store.write("RoomCalibration", "{not json").unwrap();
        let err = load_calibration(&store, "RoomCalibration").unwrap_err();
        assert!(matches!(err, StoreError::Json(_)));
    }
}
