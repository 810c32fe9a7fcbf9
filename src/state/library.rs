use rusqlite::{params, Connection, ErrorCode, Row};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::data::Resena;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid import file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("no reseña matches {0}")]
    NotFound(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The persistence collaborator: reads the whole collection, replaces
/// single records and removes them by record number.
pub trait ResenaStore {
    fn list(&self) -> StoreResult<Vec<Resena>>;
    fn update(&self, resena: &Resena) -> StoreResult<()>;
    fn delete(&self, num: &str) -> StoreResult<()>;
    fn insert(&self, resena: &Resena) -> StoreResult<i64>;
}

/// The Library manages the SQLite database holding the reseñas.
pub struct Library {
    conn: Connection,
    db_path: PathBuf,
}

impl Library {
    /// Open (or create) the database at `db_path` and make sure the schema exists.
    pub fn open(db_path: &Path) -> StoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(db_path)?;
        debug!("📁 Database opened at: {}", db_path.display());

        let mut library = Library {
            conn,
            db_path: db_path.to_path_buf(),
        };
        library.init_schema()?;

        Ok(library)
    }

    /// Database that lives only as long as the connection
    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let mut library = Library {
            conn,
            db_path: PathBuf::from(":memory:"),
        };
        library.init_schema()?;
        Ok(library)
    }

    /// Initialize the database schema.
    fn init_schema(&mut self) -> StoreResult<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS resenas (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,
                num                     TEXT NOT NULL UNIQUE,
                titulo                  TEXT NOT NULL DEFAULT '',
                lugar                   TEXT NOT NULL DEFAULT '',
                marca                   TEXT NOT NULL DEFAULT '',
                latitud                 TEXT NOT NULL DEFAULT '',
                longitud                TEXT NOT NULL DEFAULT '',
                x                       TEXT NOT NULL DEFAULT '',
                y                       TEXT NOT NULL DEFAULT '',
                elev_elip               TEXT NOT NULL DEFAULT '',
                elev_orto               TEXT NOT NULL DEFAULT '',
                fecha                   TEXT NOT NULL DEFAULT '',
                logo                    TEXT NOT NULL DEFAULT '',
                imagen_general          TEXT NOT NULL DEFAULT '',
                imagen_situacion        TEXT NOT NULL DEFAULT '',
                imagen_detalle          TEXT NOT NULL DEFAULT '',
                updated_at              INTEGER NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_resenas_num ON resenas(num)",
            [],
        )?;

        Ok(())
    }

    /// Get the path to the database file
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn count(&self) -> StoreResult<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM resenas", [], |row| row.get(0))?;
        Ok(count)
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Resena> {
        Ok(Resena {
            id: row.get(0)?,
            num: row.get(1)?,
            title: row.get(2)?,
            place: row.get(3)?,
            brand: row.get(4)?,
            latitude: row.get(5)?,
            longitude: row.get(6)?,
            utm_x: row.get(7)?,
            utm_y: row.get(8)?,
            ellipsoidal_elevation: row.get(9)?,
            orthometric_elevation: row.get(10)?,
            date: row.get(11)?,
            logo: row.get(12)?,
            general_photo: row.get(13)?,
            location_photo: row.get(14)?,
            detail_photo: row.get(15)?,
        })
    }
}

impl ResenaStore for Library {
    /// The full collection, ordered by record number
    fn list(&self) -> StoreResult<Vec<Resena>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, num, titulo, lugar, marca, latitud, longitud, x, y,
                    elev_elip, elev_orto, fecha, logo,
                    imagen_general, imagen_situacion, imagen_detalle
             FROM resenas ORDER BY num",
        )?;

        let rows = stmt.query_map([], Self::from_row)?;

        let mut resenas = Vec::new();
        for resena in rows {
            resenas.push(resena?);
        }

        Ok(resenas)
    }

    /// Replace every field of the row with `resena.id`
    fn update(&self, r: &Resena) -> StoreResult<()> {
        let changed = self.conn.execute(
            "UPDATE resenas SET
                num = ?1, titulo = ?2, lugar = ?3, marca = ?4,
                latitud = ?5, longitud = ?6, x = ?7, y = ?8,
                elev_elip = ?9, elev_orto = ?10, fecha = ?11, logo = ?12,
                imagen_general = ?13, imagen_situacion = ?14, imagen_detalle = ?15,
                updated_at = ?16
             WHERE id = ?17",
            params![
                r.num,
                r.title,
                r.place,
                r.brand,
                r.latitude,
                r.longitude,
                r.utm_x,
                r.utm_y,
                r.ellipsoidal_elevation,
                r.orthometric_elevation,
                r.date,
                r.logo,
                r.general_photo,
                r.location_photo,
                r.detail_photo,
                chrono::Utc::now().timestamp(),
                r.id,
            ],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("id {}", r.id)));
        }
        Ok(())
    }

    fn delete(&self, num: &str) -> StoreResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM resenas WHERE num = ?1", params![num])?;

        if changed == 0 {
            return Err(StoreError::NotFound(format!("num {num}")));
        }
        Ok(())
    }

    /// Insert a new row; the stored id is assigned here, `r.id` is ignored
    fn insert(&self, r: &Resena) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO resenas (
                num, titulo, lugar, marca, latitud, longitud, x, y,
                elev_elip, elev_orto, fecha, logo,
                imagen_general, imagen_situacion, imagen_detalle, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                r.num,
                r.title,
                r.place,
                r.brand,
                r.latitude,
                r.longitude,
                r.utm_x,
                r.utm_y,
                r.ellipsoidal_elevation,
                r.orthometric_elevation,
                r.date,
                r.logo,
                r.general_photo,
                r.location_photo,
                r.detail_photo,
                chrono::Utc::now().timestamp(),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for Library {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Result of a JSON import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub imported_count: usize,
    pub skipped_count: usize,
}

/// Insert every record, skipping record numbers already in the store
pub fn import_records(store: &impl ResenaStore, records: &[Resena]) -> StoreResult<ImportResult> {
    let mut result = ImportResult::default();

    for record in records {
        match store.insert(record) {
            Ok(_) => result.imported_count += 1,
            Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                result.skipped_count += 1;
            }
            Err(e) => return Err(e),
        }
    }

    Ok(result)
}

// rusqlite::Connection is not Send, so every background task opens its own.

async fn blocking<T, F>(db_path: PathBuf, job: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce(&Library) -> StoreResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let library = Library::open(&db_path)?;
        job(&library)
    })
    .await
    .map_err(|e| format!("Task join error: {e}"))?
    .map_err(|e| e.to_string())
}

pub async fn fetch_all(db_path: PathBuf) -> Result<Vec<Resena>, String> {
    let resenas = blocking(db_path, |library| library.list()).await?;
    info!("📚 Loaded {} reseñas", resenas.len());
    Ok(resenas)
}

pub async fn save(db_path: PathBuf, resena: Resena) -> Result<(), String> {
    let num = resena.num.clone();
    blocking(db_path, move |library| library.update(&resena))
        .await
        .inspect_err(|e| warn!("⚠️  Could not update reseña {num}: {e}"))
}

pub async fn remove(db_path: PathBuf, num: String) -> Result<(), String> {
    let label = num.clone();
    blocking(db_path, move |library| library.delete(&num))
        .await
        .inspect_err(|e| warn!("⚠️  Could not delete reseña {label}: {e}"))
}

/// Read a JSON array of records from `json_path` and insert it
pub async fn import_json(json_path: PathBuf, db_path: PathBuf) -> Result<ImportResult, String> {
    info!("🔍 Importing reseñas from {}", json_path.display());

    let json = tokio::fs::read_to_string(&json_path)
        .await
        .map_err(|e| format!("{}: {e}", json_path.display()))?;

    let result = blocking(db_path, move |library| {
        let records = Resena::list_from_json(&json)?;
        import_records(library, &records)
    })
    .await?;

    info!(
        "✅ Import complete: {} new, {} skipped",
        result.imported_count, result.skipped_count
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(num: &str) -> Resena {
        Resena {
            num: num.to_string(),
            title: format!("Vértice {num}"),
            brand: "Clavo".into(),
            latitude: "40° 30' 15.12345\" N".into(),
            longitude: "3° 20' 10.00000\" W".into(),
            ..Default::default()
        }
    }

    #[test]
    fn insert_and_list_ordered_by_num() {
        let library = Library::open_in_memory().unwrap();
        library.insert(&sample("B-2")).unwrap();
        library.insert(&sample("A-1")).unwrap();

        let nums: Vec<_> = library.list().unwrap().into_iter().map(|r| r.num).collect();
        assert_eq!(nums, vec!["A-1", "B-2"]);
        assert_eq!(library.count().unwrap(), 2);
    }

    #[test]
    fn update_replaces_whole_record() {
        let library = Library::open_in_memory().unwrap();
        let id = library.insert(&sample("A-1")).unwrap();

        let mut edited = library.list().unwrap().remove(0);
        assert_eq!(edited.id, id);
        edited.title = "Nuevo".into();
        edited.num = "A-9".into();
        edited.logo = "data:image/png;base64,AAAA".into();
        library.update(&edited).unwrap();

        let stored = library.list().unwrap().remove(0);
        assert_eq!(stored, edited);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let library = Library::open_in_memory().unwrap();
        let mut missing = sample("A-1");
        missing.id = 42;
        assert!(matches!(library.update(&missing), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn delete_by_num() {
        let library = Library::open_in_memory().unwrap();
        library.insert(&sample("A-1")).unwrap();
        library.insert(&sample("A-2")).unwrap();

        library.delete("A-1").unwrap();
        let nums: Vec<_> = library.list().unwrap().into_iter().map(|r| r.num).collect();
        assert_eq!(nums, vec!["A-2"]);

        assert!(matches!(library.delete("A-1"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn import_skips_duplicate_numbers() {
        let library = Library::open_in_memory().unwrap();
        library.insert(&sample("A-1")).unwrap();

        let result =
            import_records(&library, &[sample("A-1"), sample("A-2"), sample("A-3")]).unwrap();
        assert_eq!(
            result,
            ImportResult {
                imported_count: 2,
                skipped_count: 1
            }
        );
    }

    #[test]
    fn opens_database_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("resenas.db");

        {
            let library = Library::open(&path).unwrap();
            library.insert(&sample("A-1")).unwrap();
            assert_eq!(library.path(), &path);
        }

        let reopened = Library::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }

    #[test]
    fn background_helpers_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("resenas.db");
        let json = dir.path().join("import.json");
        std::fs::write(
            &json,
            r#"[{"num": "7", "titulo": "Siete"}, {"num": "8", "titulo": "Ocho"}]"#,
        )
        .unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        rt.block_on(async {
            let imported = import_json(json, db.clone()).await.unwrap();
            assert_eq!(imported.imported_count, 2);

            let all = fetch_all(db.clone()).await.unwrap();
            assert_eq!(all.len(), 2);

            remove(db.clone(), "7".into()).await.unwrap();
            assert!(remove(db.clone(), "7".into()).await.is_err());

            let mut eight = fetch_all(db.clone()).await.unwrap().remove(0);
            eight.title = "Ocho bis".into();
            save(db.clone(), eight).await.unwrap();
            assert_eq!(fetch_all(db).await.unwrap()[0].title, "Ocho bis");
        });
    }
}
