//! SQLite store backend.

use super::{distinct_ids, KpiSnapshot, ShipmentFilter, ShipmentStore, StoreError};
use crate::data::{ShipmentRecord, ValidatedTable};
use crate::stats::{KpiResult, Turnover};
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tracing::debug;

const MIG_0001: &str = include_str!("migrations/0001_init.sql");

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

/// Row as stored, before dates and quantities are checked.
struct StoredShipment {
    shipment_id: String,
    origin: String,
    destination: String,
    order_date: Option<String>,
    promised_date: String,
    actual_date: String,
    quantity_shipped: i64,
    quantity_received: i64,
    lane: String,
}

impl StoredShipment {
    fn into_record(self) -> Result<ShipmentRecord, StoreError> {
        Ok(ShipmentRecord {
            order_date: self.order_date.as_deref().map(parse_date).transpose()?,
            promised_date: parse_date(&self.promised_date)?,
            actual_date: parse_date(&self.actual_date)?,
            quantity_shipped: to_quantity(self.quantity_shipped)?,
            quantity_received: to_quantity(self.quantity_received)?,
            shipment_id: self.shipment_id,
            origin: self.origin,
            destination: self.destination,
            lane: self.lane,
        })
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| StoreError::Corrupt(format!("bad date `{raw}`: {e}")))
}

fn to_quantity(n: i64) -> Result<u64, StoreError> {
    u64::try_from(n).map_err(|_| StoreError::Corrupt(format!("negative quantity {n}")))
}

fn to_sql_int(n: u64) -> Result<i64, StoreError> {
    i64::try_from(n).map_err(|_| StoreError::Corrupt(format!("quantity {n} exceeds SQLite range")))
}

impl SqliteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let this = Self {
            path,
            conn: Mutex::new(conn),
        };
        this.migrate()?;
        Ok(this)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn migrate(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();
        conn.execute_batch(MIG_0001)?;
        let v: i64 = conn.query_row("PRAGMA user_version;", [], |r| r.get(0))?;
        if v < 1 {
            conn.execute_batch("PRAGMA user_version = 1;")?;
        }
        Ok(())
    }
}

impl ShipmentStore for SqliteStore {
    fn save(&self, table: &ValidatedTable) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO shipments(shipment_id, origin, destination, order_date,
                       promised_date, actual_date, quantity_shipped, quantity_received, lane)
                   VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                   ON CONFLICT(shipment_id) DO UPDATE SET
                       origin = excluded.origin,
                       destination = excluded.destination,
                       order_date = excluded.order_date,
                       promised_date = excluded.promised_date,
                       actual_date = excluded.actual_date,
                       quantity_shipped = excluded.quantity_shipped,
                       quantity_received = excluded.quantity_received,
                       lane = excluded.lane"#,
            )?;
            for r in table.records() {
                stmt.execute(params![
                    r.shipment_id,
                    r.origin,
                    r.destination,
                    r.order_date.map(|d| d.format(DATE_FORMAT).to_string()),
                    r.promised_date.format(DATE_FORMAT).to_string(),
                    r.actual_date.format(DATE_FORMAT).to_string(),
                    to_sql_int(r.quantity_shipped)?,
                    to_sql_int(r.quantity_received)?,
                    r.lane,
                ])?;
            }
        }
        tx.commit()?;
        let saved = distinct_ids(table.records());
        debug!(rows = table.len(), saved, path = %self.path.display(), "saved shipments");
        Ok(saved)
    }

    fn load(&self, filter: &ShipmentFilter) -> Result<Vec<ShipmentRecord>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"SELECT shipment_id, origin, destination, order_date, promised_date,
                      actual_date, quantity_shipped, quantity_received, lane
               FROM shipments
               WHERE (?1 IS NULL OR lane = ?1)
                 AND (?2 IS NULL OR origin = ?2)
                 AND (?3 IS NULL OR destination = ?3)
                 AND (?4 IS NULL OR promised_date >= ?4)
                 AND (?5 IS NULL OR promised_date <= ?5)
               ORDER BY promised_date ASC, shipment_id ASC"#,
        )?;
        let rows = stmt.query_map(
            params![
                filter.lane,
                filter.origin,
                filter.destination,
                filter.promised_from.map(|d| d.format(DATE_FORMAT).to_string()),
                filter.promised_to.map(|d| d.format(DATE_FORMAT).to_string()),
            ],
            |row| {
                Ok(StoredShipment {
                    shipment_id: row.get(0)?,
                    origin: row.get(1)?,
                    destination: row.get(2)?,
                    order_date: row.get(3)?,
                    promised_date: row.get(4)?,
                    actual_date: row.get(5)?,
                    quantity_shipped: row.get(6)?,
                    quantity_received: row.get(7)?,
                    lane: row.get(8)?,
                })
            },
        )?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.into_record()?);
        }
        Ok(out)
    }

    fn record_kpis(&self, kpis: &KpiResult) -> Result<KpiSnapshot, StoreError> {
        let snapshot = KpiSnapshot::from_kpis(kpis, Utc::now());
        let shipments = i64::try_from(snapshot.shipments)
            .map_err(|_| StoreError::Corrupt("shipment count exceeds SQLite range".to_string()))?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kpi_results(recorded_at, shipments, on_time_rate, inventory_turnover)
             VALUES(?1, ?2, ?3, ?4)",
            params![
                snapshot.recorded_at.to_rfc3339(),
                shipments,
                snapshot.on_time_rate,
                snapshot.inventory_turnover.ratio(),
            ],
        )?;
        Ok(snapshot)
    }

    fn kpi_history(&self, limit: usize) -> Result<Vec<KpiSnapshot>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT recorded_at, shipments, on_time_rate, inventory_turnover
             FROM kpi_results ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<f64>>(3)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (recorded_at, shipments, on_time_rate, turnover) = row?;
            let recorded_at = DateTime::parse_from_rfc3339(&recorded_at)
                .map_err(|e| StoreError::Corrupt(format!("bad timestamp `{recorded_at}`: {e}")))?
                .with_timezone(&Utc);
            out.push(KpiSnapshot {
                recorded_at,
                shipments: usize::try_from(shipments)
                    .map_err(|_| StoreError::Corrupt(format!("bad shipment count {shipments}")))?,
                on_time_rate,
                inventory_turnover: turnover.map_or(Turnover::Undefined, Turnover::Ratio),
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::KpiCalculator;
    use crate::store::test_support::{validated, SAMPLE};
    use tempfile::TempDir;

    #[test]
    fn sqlite_roundtrip_with_filter() {
        let td = TempDir::new().unwrap();
        let store = SqliteStore::open(td.path().join("kpi.sqlite3")).unwrap();
        let table = validated(SAMPLE);
        assert_eq!(store.save(&table).unwrap(), 3);

        let all = store.load(&ShipmentFilter::all()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].shipment_id, "S2");
        assert!(table.records().contains(&all[2]));

        let oslo_a = store
            .load(&ShipmentFilter::all().lane("A").origin("Oslo"))
            .unwrap();
        assert_eq!(oslo_a.len(), 1);
        assert_eq!(oslo_a[0].quantity_received, 8);
    }

    #[test]
    fn duplicate_ids_collapse_to_the_last_row() {
        let td = TempDir::new().unwrap();
        let store = SqliteStore::open(td.path().join("kpi.sqlite3")).unwrap();
        let table = validated(&format!("{SAMPLE}S3,Bergen,Oslo,2024-01-02,2024-01-02,9,9,A\n"));
        assert_eq!(store.save(&table).unwrap(), 3);

        let all = store.load(&ShipmentFilter::all()).unwrap();
        assert_eq!(all.len(), 3);
        let s3 = all.iter().find(|r| r.shipment_id == "S3").unwrap();
        assert_eq!(s3.quantity_shipped, 9);
    }

    #[test]
    fn reopened_store_keeps_history() {
        let td = TempDir::new().unwrap();
        let path = td.path().join("nested").join("kpi.sqlite3");
        let kpis = KpiCalculator::compute(&validated(SAMPLE));
        {
            let store = SqliteStore::open(&path).unwrap();
            store.record_kpis(&kpis).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let history = store.kpi_history(5).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].shipments, 3);
        assert_eq!(history[0].inventory_turnover, kpis.inventory_turnover);
    }

    #[test]
    fn undefined_turnover_is_stored_as_null() {
        let td = TempDir::new().unwrap();
        let store = SqliteStore::open(td.path().join("kpi.sqlite3")).unwrap();
        let mut kpis = KpiCalculator::compute(&validated(SAMPLE));
        kpis.inventory_turnover = Turnover::Undefined;
        store.record_kpis(&kpis).unwrap();
        assert_eq!(
            store.kpi_history(1).unwrap()[0].inventory_turnover,
            Turnover::Undefined
        );
    }
}
