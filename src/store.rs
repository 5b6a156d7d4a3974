//! Record stores
//!
//! A [`RecordStore`] is the persisted, append-only collection the dashboards
//! read from. Records are validated on the way in and kept ordered by date;
//! one logical record per (date, source) is allowed.
//!
//! Two implementations are provided:
//! - [`InMemoryStore`] for tests and short-lived sessions
//! - [`JsonFileStore`] keeping one JSON document per record kind in a
//!   directory (`sleep.json`, `recovery.json`)

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::{PulseCoachError, Result, StoreError};
use crate::recovery::{DatedRecord, RecordValidationError, RecoveryRecord, SleepRecord};

/// Persisted collection of sleep and recovery records
pub trait RecordStore: Send + Sync {
    /// All sleep records, ascending by date
    fn sleep_records(&self) -> Result<Vec<SleepRecord>>;

    /// All recovery records, ascending by date
    fn recovery_records(&self) -> Result<Vec<RecoveryRecord>>;

    /// Validate and append a sleep record
    fn add_sleep(&self, record: SleepRecord) -> Result<()>;

    /// Validate and append a recovery record
    fn add_recovery(&self, record: RecoveryRecord) -> Result<()>;

    /// Append one day's sleep and recovery records together
    ///
    /// Both records are validated and checked for duplicates before either
    /// is written, so a rejected pair leaves the store unchanged.
    fn add_day(&self, sleep: SleepRecord, recovery: RecoveryRecord) -> Result<()>;

    fn latest_sleep(&self) -> Result<Option<SleepRecord>> {
        Ok(self.sleep_records()?.pop())
    }

    fn latest_recovery(&self) -> Result<Option<RecoveryRecord>> {
        Ok(self.recovery_records()?.pop())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for std::sync::Arc<S> {
    fn sleep_records(&self) -> Result<Vec<SleepRecord>> {
        (**self).sleep_records()
    }

    fn recovery_records(&self) -> Result<Vec<RecoveryRecord>> {
        (**self).recovery_records()
    }

    fn add_sleep(&self, record: SleepRecord) -> Result<()> {
        (**self).add_sleep(record)
    }

    fn add_recovery(&self, record: RecoveryRecord) -> Result<()> {
        (**self).add_recovery(record)
    }

    fn add_day(&self, sleep: SleepRecord, recovery: RecoveryRecord) -> Result<()> {
        (**self).add_day(sleep, recovery)
    }
}

/// Per-kind storage details shared by the store implementations
trait StoredRecord: DatedRecord + Clone + Serialize + DeserializeOwned {
    const KIND: &'static str;
    const FILE_NAME: &'static str;

    fn check(&self) -> std::result::Result<(), RecordValidationError>;
}

impl StoredRecord for SleepRecord {
    const KIND: &'static str = "sleep";
    const FILE_NAME: &'static str = "sleep.json";

    fn check(&self) -> std::result::Result<(), RecordValidationError> {
        self.validate()
    }
}

impl StoredRecord for RecoveryRecord {
    const KIND: &'static str = "recovery";
    const FILE_NAME: &'static str = "recovery.json";

    fn check(&self) -> std::result::Result<(), RecordValidationError> {
        self.validate()
    }
}

/// Validate `record` and reject it if `records` already holds its (date, source)
fn admit<R: StoredRecord>(records: &[R], record: &R) -> Result<()> {
    if let Err(e) = record.check() {
        warn!(kind = R::KIND, date = %record.date(), error = %e, "Rejected invalid record");
        return Err(e.into());
    }

    let duplicate = records
        .iter()
        .any(|r| r.date() == record.date() && r.source() == record.source());
    if duplicate {
        warn!(
            kind = R::KIND,
            date = %record.date(),
            source = record.source(),
            "Rejected duplicate record"
        );
        return Err(StoreError::Duplicate {
            kind: R::KIND.to_string(),
            date: record.date().to_string(),
            source_name: record.source().to_string(),
        }
        .into());
    }
    Ok(())
}

/// Insert an admitted record keeping date order
///
/// Records sharing a date keep their insertion order.
fn place<R: StoredRecord>(records: &mut Vec<R>, record: R) {
    let position = records.partition_point(|r| r.date() <= record.date());
    debug!(kind = R::KIND, date = %record.date(), position, "Inserted record");
    records.insert(position, record);
}

fn insert_record<R: StoredRecord>(records: &mut Vec<R>, record: R) -> Result<()> {
    admit(records, &record)?;
    place(records, record);
    Ok(())
}

fn poisoned<E: std::fmt::Display>(e: E) -> PulseCoachError {
    StoreError::Poisoned(e.to_string()).into()
}

/// Store held entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sleep: RwLock<Vec<SleepRecord>>,
    recovery: RwLock<Vec<RecoveryRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryStore {
    fn sleep_records(&self) -> Result<Vec<SleepRecord>> {
        Ok(self.sleep.read().map_err(poisoned)?.clone())
    }

    fn recovery_records(&self) -> Result<Vec<RecoveryRecord>> {
        Ok(self.recovery.read().map_err(poisoned)?.clone())
    }

    fn add_sleep(&self, record: SleepRecord) -> Result<()> {
        let mut records = self.sleep.write().map_err(poisoned)?;
        insert_record(&mut *records, record)
    }

    fn add_recovery(&self, record: RecoveryRecord) -> Result<()> {
        let mut records = self.recovery.write().map_err(poisoned)?;
        insert_record(&mut *records, record)
    }

    fn add_day(&self, sleep: SleepRecord, recovery: RecoveryRecord) -> Result<()> {
        // Lock order: sleep, then recovery
        let mut sleeps = self.sleep.write().map_err(poisoned)?;
        let mut recoveries = self.recovery.write().map_err(poisoned)?;
        admit(&sleeps, &sleep)?;
        admit(&recoveries, &recovery)?;
        place(&mut *sleeps, sleep);
        place(&mut *recoveries, recovery);
        Ok(())
    }
}

/// Store persisting each record kind as a JSON array in a directory
///
/// A missing file reads as an empty collection. A file that cannot be
/// decoded is reported as [`StoreError::Corrupted`] and never overwritten.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        info!(dir = %dir.display(), "Opened JSON record store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for<R: StoredRecord>(&self) -> PathBuf {
        self.dir.join(R::FILE_NAME)
    }

    fn load<R: StoredRecord>(&self) -> Result<Vec<R>> {
        let path = self.path_for::<R>();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<R> =
            serde_json::from_str(&content).map_err(|e| StoreError::Corrupted {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        records.sort_by_key(|r| r.date());
        Ok(records)
    }

    fn save<R: StoredRecord>(&self, records: &[R]) -> Result<()> {
        let path = self.path_for::<R>();
        let json = serde_json::to_string_pretty(records).map_err(|e| StoreError::WriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        // Write to a sibling file first so a crash never truncates the collection
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| StoreError::WriteFailed {
            path: tmp.clone(),
            reason: e.to_string(),
        })?;
        fs::rename(&tmp, &path).map_err(|e| StoreError::WriteFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }

    fn append<R: StoredRecord>(&self, record: R) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let mut records = self.load::<R>()?;
        insert_record(&mut records, record)?;
        self.save(&records)
    }

    fn append_day(&self, sleep: SleepRecord, recovery: RecoveryRecord) -> Result<()> {
        let _guard = self.write_lock.lock().map_err(poisoned)?;
        let previous_sleeps = self.load::<SleepRecord>()?;
        let mut recoveries = self.load::<RecoveryRecord>()?;
        admit(&previous_sleeps, &sleep)?;
        admit(&recoveries, &recovery)?;

        let mut sleeps = previous_sleeps.clone();
        place(&mut sleeps, sleep);
        place(&mut recoveries, recovery);

        self.save(&sleeps)?;
        if let Err(e) = self.save(&recoveries) {
            // Put the sleep collection back so the day is not half written
            if let Err(restore) = self.save(&previous_sleeps) {
                warn!(error = %restore, "Could not restore sleep records");
            }
            return Err(e);
        }
        Ok(())
    }
}

impl RecordStore for JsonFileStore {
    fn sleep_records(&self) -> Result<Vec<SleepRecord>> {
        self.load()
    }

    fn recovery_records(&self) -> Result<Vec<RecoveryRecord>> {
        self.load()
    }

    fn add_sleep(&self, record: SleepRecord) -> Result<()> {
        self.append(record)
    }

    fn add_recovery(&self, record: RecoveryRecord) -> Result<()> {
        self.append(record)
    }

    fn add_day(&self, sleep: SleepRecord, recovery: RecoveryRecord) -> Result<()> {
        self.append_day(sleep, recovery)
    }
}
