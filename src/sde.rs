// src/sde.rs
//! Read-only lookups against the EVE Static Data Export.
//!
//! The dataset is an external sqlite dump (solar systems, stations, item
//! types, celestials) opened once at startup and shared immutably. Misses
//! return `None`; the renderer substitutes its sentinel strings.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use rusqlite::{OpenFlags, OptionalExtension as _};

pub trait ReferenceData: Send + Sync {
    fn solar_system_name(&self, id: i64) -> Option<String>;
    fn type_name(&self, id: i64) -> Option<String>;
    /// Planets and moons both live in the denormalized map table.
    fn celestial_name(&self, id: i64) -> Option<String>;
    fn station_name(&self, id: i64) -> Option<String>;
}

pub struct SdeDataset {
    conn: Mutex<rusqlite::Connection>,
}

impl SdeDataset {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = rusqlite::Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening static data export at {}", path.display()))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lookup(&self, sql: &str, id: i64) -> Option<String> {
        let conn = self.conn.lock().expect("sde mutex poisoned");
        match conn.query_row(sql, [id], |r| r.get(0)).optional() {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(error = ?e, id, "static data lookup failed");
                None
            }
        }
    }
}

impl ReferenceData for SdeDataset {
    fn solar_system_name(&self, id: i64) -> Option<String> {
        self.lookup(
            "SELECT solarSystemName FROM mapSolarSystems WHERE solarSystemID = ?1",
            id,
        )
    }

    fn type_name(&self, id: i64) -> Option<String> {
        self.lookup("SELECT typeName FROM invTypes WHERE typeID = ?1", id)
    }

    fn celestial_name(&self, id: i64) -> Option<String> {
        self.lookup("SELECT itemName FROM mapDenormalize WHERE itemID = ?1", id)
    }

    fn station_name(&self, id: i64) -> Option<String> {
        self.lookup(
            "SELECT stationName FROM staStations WHERE stationID = ?1",
            id,
        )
    }
}
