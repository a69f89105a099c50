// Rust guideline compliant 2026-10-17

//! `SQLite` adapter for the `RecipientRepository` and `SettingsRepository`
//! ports.
//!
//! One `recipients` table holds identity, location codes, the criteria flags
//! and the two derived columns (`saw_score`, `label`). The `settings` table
//! holds at most one row (`id = 1`), created lazily with defaults.
//!
//! Score write-back runs inside a single transaction, so a failed batch leaves
//! no partial update behind.

use domain::{
    Criteria, EligibilityLabel, Location, NewRecipient, Recipient, RecipientId, RecipientQuery,
    RecipientRepository, RepositoryError, ScoreUpdate, Setting, SettingsRepository,
};
use sqlx::Row as _;
use sqlx::sqlite::SqliteRow;

/// Selected columns, in the order `recipient_from_row` reads them.
const RECIPIENT_COLUMNS: &str = "id, name, national_id, province, regency, district, village,
    occupation, dtks, extreme_poverty, loss_of_livelihood, unemployed, disability,
    chronic_illness, single_elderly_household, pkh, pre_employment_card, bst,
    other_social_aid, saw_score, label";

/// Bound parameters per `IN (...)` chunk in `by_ids`.
const ID_CHUNK: usize = 500;

/// Repository adapter backed by a `SQLite` database via `sqlx`.
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: sqlx::SqlitePool,
}

impl SqliteRepository {
    /// Open or create the database and initialize the schema.
    ///
    /// Tables are created with `CREATE TABLE IF NOT EXISTS`, so repeated
    /// calls are safe.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` when the connection or schema creation fails.
    pub async fn new(db_url: &str) -> Result<Self, sqlx::Error> {
        let opts = db_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(opts).await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS recipients (
                id                       INTEGER PRIMARY KEY AUTOINCREMENT,
                name                     TEXT    NOT NULL,
                national_id              TEXT,
                province                 TEXT    NOT NULL DEFAULT '',
                regency                  TEXT    NOT NULL DEFAULT '',
                district                 TEXT    NOT NULL DEFAULT '',
                village                  TEXT    NOT NULL DEFAULT '',
                occupation               TEXT    NOT NULL DEFAULT '',
                dtks                     INTEGER NOT NULL DEFAULT 0,
                extreme_poverty          INTEGER NOT NULL DEFAULT 0,
                loss_of_livelihood       INTEGER NOT NULL DEFAULT 0,
                unemployed               INTEGER NOT NULL DEFAULT 0,
                disability               INTEGER NOT NULL DEFAULT 0,
                chronic_illness          INTEGER NOT NULL DEFAULT 0,
                single_elderly_household INTEGER NOT NULL DEFAULT 0,
                pkh                      INTEGER NOT NULL DEFAULT 0,
                pre_employment_card      INTEGER NOT NULL DEFAULT 0,
                bst                      INTEGER NOT NULL DEFAULT 0,
                other_social_aid         INTEGER NOT NULL DEFAULT 0,
                saw_score                REAL,            -- NULL until scored
                label                    TEXT             -- NULL until scored
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS settings (
                id            INTEGER PRIMARY KEY CHECK (id = 1),
                passing_grade REAL    NOT NULL,
                kuota         INTEGER NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }

    /// Insert every recipient in one transaction and return the assigned ids
    /// in input order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Unavailable` when any insert fails; nothing
    /// is inserted in that case.
    pub async fn insert_many(
        &self,
        recipients: Vec<NewRecipient>,
    ) -> Result<Vec<RecipientId>, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| unavailable("insert_many", &e))?;
        let mut ids = Vec::with_capacity(recipients.len());
        for r in recipients {
            let c = r.criteria;
            let done = sqlx::query(
                "INSERT INTO recipients
                 (name, national_id, province, regency, district, village, occupation,
                  dtks, extreme_poverty, loss_of_livelihood, unemployed, disability,
                  chronic_illness, single_elderly_household, pkh, pre_employment_card,
                  bst, other_social_aid)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&r.name)
            .bind(&r.national_id)
            .bind(&r.location.province)
            .bind(&r.location.regency)
            .bind(&r.location.district)
            .bind(&r.location.village)
            .bind(&r.occupation)
            .bind(c.dtks)
            .bind(c.extreme_poverty)
            .bind(c.loss_of_livelihood)
            .bind(c.unemployed)
            .bind(c.disability)
            .bind(c.chronic_illness)
            .bind(c.single_elderly_household)
            .bind(c.pkh)
            .bind(c.pre_employment_card)
            .bind(c.bst)
            .bind(c.other_social_aid)
            .execute(&mut *tx)
            .await
            .map_err(|e| unavailable("insert_many", &e))?;
            ids.push(RecipientId(done.last_insert_rowid()));
        }
        tx.commit().await.map_err(|e| unavailable("insert_many", &e))?;
        tracing::info!("sqlite.insert_many: inserted={}", ids.len());
        Ok(ids)
    }
}

fn unavailable(op: &str, e: &sqlx::Error) -> RepositoryError {
    tracing::error!("sqlite.{op}: {e}");
    RepositoryError::Unavailable { reason: e.to_string() }
}

fn recipient_from_row(row: &SqliteRow) -> Result<Recipient, RepositoryError> {
    let invalid = |e: sqlx::Error| RepositoryError::InvalidRow { reason: e.to_string() };
    let flag = |col: &str| row.try_get::<bool, _>(col).map_err(invalid);
    let label = row
        .try_get::<Option<String>, _>("label")
        .map_err(invalid)?
        .map(|s| s.parse::<EligibilityLabel>())
        .transpose()
        .map_err(|e| RepositoryError::InvalidRow { reason: e.to_string() })?;
    Ok(Recipient {
        id: RecipientId(row.try_get("id").map_err(invalid)?),
        name: row.try_get("name").map_err(invalid)?,
        national_id: row.try_get("national_id").map_err(invalid)?,
        location: Location {
            province: row.try_get("province").map_err(invalid)?,
            regency: row.try_get("regency").map_err(invalid)?,
            district: row.try_get("district").map_err(invalid)?,
            village: row.try_get("village").map_err(invalid)?,
        },
        occupation: row.try_get("occupation").map_err(invalid)?,
        criteria: Criteria {
            dtks: flag("dtks")?,
            extreme_poverty: flag("extreme_poverty")?,
            loss_of_livelihood: flag("loss_of_livelihood")?,
            unemployed: flag("unemployed")?,
            disability: flag("disability")?,
            chronic_illness: flag("chronic_illness")?,
            single_elderly_household: flag("single_elderly_household")?,
            pkh: flag("pkh")?,
            pre_employment_card: flag("pre_employment_card")?,
            bst: flag("bst")?,
            other_social_aid: flag("other_social_aid")?,
        },
        saw_score: row.try_get("saw_score").map_err(invalid)?,
        label,
    })
}

impl RecipientRepository for SqliteRepository {
    /// Names compare case-insensitively (ASCII) after trimming; location
    /// filters compare exactly when present.
    async fn find_by_name(&self, query: &RecipientQuery) -> Result<Vec<Recipient>, RepositoryError> {
        let sql = format!(
            "SELECT {RECIPIENT_COLUMNS} FROM recipients
             WHERE TRIM(name) = TRIM(?1) COLLATE NOCASE
               AND (?2 IS NULL OR province = ?2)
               AND (?3 IS NULL OR regency  = ?3)
               AND (?4 IS NULL OR district = ?4)
               AND (?5 IS NULL OR village  = ?5)
             ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(&query.name)
            .bind(&query.province)
            .bind(&query.regency)
            .bind(&query.district)
            .bind(&query.village)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| unavailable("find_by_name", &e))?;
        rows.iter().map(recipient_from_row).collect()
    }

    async fn all(&self) -> Result<Vec<Recipient>, RepositoryError> {
        let sql = format!("SELECT {RECIPIENT_COLUMNS} FROM recipients ORDER BY id");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| unavailable("all", &e))?;
        rows.iter().map(recipient_from_row).collect()
    }

    async fn by_ids(&self, ids: &[RecipientId]) -> Result<Vec<Recipient>, RepositoryError> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(ID_CHUNK) {
            let placeholders = vec!["?"; chunk.len()].join(", ");
            let sql = format!(
                "SELECT {RECIPIENT_COLUMNS} FROM recipients WHERE id IN ({placeholders})"
            );
            let mut q = sqlx::query(&sql);
            for id in chunk {
                q = q.bind(id.0);
            }
            let rows = q
                .fetch_all(&self.pool)
                .await
                .map_err(|e| unavailable("by_ids", &e))?;
            for row in &rows {
                out.push(recipient_from_row(row)?);
            }
        }
        out.sort_by_key(|r| r.id);
        out.dedup_by_key(|r| r.id);
        Ok(out)
    }

    /// Unknown ids update zero rows and are not an error.
    async fn bulk_update(&self, updates: Vec<ScoreUpdate>) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(|e| unavailable("bulk_update", &e))?;
        for u in &updates {
            sqlx::query("UPDATE recipients SET saw_score = ?, label = ? WHERE id = ?")
                .bind(u.saw_score)
                .bind(u.label.as_str())
                .bind(u.id.0)
                .execute(&mut *tx)
                .await
                .map_err(|e| unavailable("bulk_update", &e))?;
        }
        tx.commit().await.map_err(|e| unavailable("bulk_update", &e))?;
        tracing::debug!("sqlite.bulk_update: rows={}", updates.len());
        Ok(())
    }
}

impl SettingsRepository for SqliteRepository {
    async fn load_or_init(&self) -> Result<Setting, RepositoryError> {
        let defaults = Setting::default();
        sqlx::query("INSERT OR IGNORE INTO settings (id, passing_grade, kuota) VALUES (1, ?, ?)")
            .bind(defaults.passing_grade)
            .bind(i64::from(defaults.kuota))
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("load_or_init", &e))?;
        let row = sqlx::query("SELECT passing_grade, kuota FROM settings WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| unavailable("load_or_init", &e))?;
        let invalid = |reason: String| RepositoryError::InvalidRow { reason };
        let passing_grade: f64 = row.try_get("passing_grade").map_err(|e| invalid(e.to_string()))?;
        let kuota: i64 = row.try_get("kuota").map_err(|e| invalid(e.to_string()))?;
        let kuota = u32::try_from(kuota).map_err(|e| invalid(format!("kuota {kuota}: {e}")))?;
        Setting::new(passing_grade, kuota).map_err(|e| invalid(e.to_string()))
    }

    async fn save(&self, setting: Setting) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR REPLACE INTO settings (id, passing_grade, kuota) VALUES (1, ?, ?)")
            .bind(setting.passing_grade)
            .bind(i64::from(setting.kuota))
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("save_settings", &e))?;
        tracing::info!(
            "sqlite.save_settings: passing_grade={} kuota={}",
            setting.passing_grade,
            setting.kuota
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
