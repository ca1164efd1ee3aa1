//! `roomscan-memory` – persistence of calibration results.
//!
//! The calibration engine hands its final record to an injected key-value
//! store; downstream consumers read it back from the same store.
//!
//! # Modules
//!
//! - [`store`] – the [`KeyValueStore`][store::KeyValueStore] trait with a
//!   SQLite-backed [`SqliteStore`][store::SqliteStore] and an
//!   [`InMemoryStore`][store::InMemoryStore].
//! - [`calibration`] – [`save_calibration`][calibration::save_calibration] /
//!   [`load_calibration`][calibration::load_calibration]: JSON encoding of the
//!   [`CalibrationRecord`][roomscan_types::CalibrationRecord].

pub mod calibration;
pub mod store;

pub use calibration::{load_calibration, save_calibration};
pub use store::{InMemoryStore, KeyValueStore, SqliteStore, StoreError};
