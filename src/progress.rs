use std::{
    fs::{create_dir_all, rename},
    io,
    path::{Path, PathBuf},
};

use include_dir::{Dir, include_dir};
use log::{debug, trace, warn};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};
use rusqlite_migration::Migrations;
use thiserror::Error;

use crate::repository::{Uid, UidValidity};

static MIGRATIONS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/migrations");

const STATE_FILE: &str = "imapmirror.db";

/// Position of a pairing: everything up to `last_uid` has been transferred,
/// as long as the source still reports `uid_validity`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncProgress {
    last_uid: Option<Uid>,
    uid_validity: Option<UidValidity>,
}

impl SyncProgress {
    pub fn new(last_uid: Option<Uid>, uid_validity: UidValidity) -> Self {
        Self {
            last_uid,
            uid_validity: Some(uid_validity),
        }
    }

    pub fn last_uid(&self) -> Option<Uid> {
        self.last_uid
    }

    pub fn uid_validity(&self) -> Option<UidValidity> {
        self.uid_validity
    }

    fn from_stored(last_uid: i64, uid_validity: Option<i64>) -> Result<Self, ProgressStoreError> {
        let last_uid = u32::try_from(last_uid)
            .map_err(|_| ProgressStoreError::Inconsistent("last_uid out of range"))?;
        let last_uid = if last_uid == 0 {
            None
        } else {
            Some(Uid::try_from(last_uid).map_err(ProgressStoreError::Inconsistent)?)
        };
        let uid_validity = uid_validity
            .map(UidValidity::from_stored)
            .transpose()
            .map_err(ProgressStoreError::Inconsistent)?;

        Ok(Self {
            last_uid,
            uid_validity,
        })
    }
}

#[derive(Debug, Error)]
pub enum ProgressStoreError {
    #[error("IO issue with state directory: {0}")]
    Io(#[from] io::Error),
    #[error("state database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("migrating state database failed: {0}")]
    Migration(#[from] rusqlite_migration::Error),
    #[error("stored progress is inconsistent: {0}")]
    Inconsistent(&'static str),
}

impl ProgressStoreError {
    fn is_corruption(&self) -> bool {
        let error = match self {
            Self::Db(error) | Self::Migration(rusqlite_migration::Error::RusqliteError { err: error, .. }) => error,
            _ => return false,
        };
        matches!(
            error.sqlite_error_code(),
            Some(ErrorCode::NotADatabase | ErrorCode::DatabaseCorrupt)
        )
    }
}

/// Durable [`SyncProgress`] records, one per pairing key, in a SQLite
/// database inside the state directory.
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join(STATE_FILE),
        }
    }

    /// Never fails: a missing or unreadable record means starting from scratch.
    pub fn load(&self, key: &str) -> SyncProgress {
        match self.try_load(key) {
            Ok(Some(progress)) => {
                debug!("loaded progress for {key}: {progress:?}");
                progress
            }
            Ok(None) => {
                debug!("no progress recorded for {key}");
                SyncProgress::default()
            }
            Err(error) => {
                warn!("ignoring unreadable progress for {key}: {error}");
                SyncProgress::default()
            }
        }
    }

    fn try_load(&self, key: &str) -> Result<Option<SyncProgress>, ProgressStoreError> {
        if !self.path.try_exists()? {
            return Ok(None);
        }
        trace!("reading state file {}", self.path.to_string_lossy());
        let db = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        let stored = db
            .query_row(
                "select last_uid, uid_validity from sync_progress where key = ?1",
                [key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?;

        stored
            .map(|(last_uid, uid_validity)| SyncProgress::from_stored(last_uid, uid_validity))
            .transpose()
    }

    pub fn save(&self, key: &str, progress: &SyncProgress) -> Result<(), ProgressStoreError> {
        trace!("saving progress for {key}: {progress:?}");
        let db = self.open_for_writing()?;
        db.execute(
            "insert into sync_progress (key, last_uid, uid_validity, updated_at)
                values (?1, ?2, ?3, ?4)
                on conflict(key) do update set
                    last_uid = excluded.last_uid,
                    uid_validity = excluded.uid_validity,
                    updated_at = excluded.updated_at",
            params![
                key,
                progress.last_uid.map_or(0, u32::from),
                progress.uid_validity.map(UidValidity::to_stored),
                jiff::Timestamp::now().to_string(),
            ],
        )?;

        Ok(())
    }

    fn open_for_writing(&self) -> Result<Connection, ProgressStoreError> {
        if let Some(state_dir) = self.path.parent() {
            create_dir_all(state_dir)?;
        }
        match self.open_and_migrate() {
            Err(error) if error.is_corruption() => {
                let corrupt = self.path.with_extension("db.corrupt");
                warn!(
                    "state file {} is corrupt, moving it to {}",
                    self.path.to_string_lossy(),
                    corrupt.to_string_lossy()
                );
                rename(&self.path, &corrupt)?;
                self.open_and_migrate()
            }
            result => result,
        }
    }

    fn open_and_migrate(&self) -> Result<Connection, ProgressStoreError> {
        let mut db = Connection::open(&self.path)?;
        db.execute_batch(
            "pragma journal_mode=wal;
            pragma synchronous=full;",
        )?;
        Migrations::from_directory(&MIGRATIONS_DIR)?.to_latest(&mut db)?;

        Ok(db)
    }
}
