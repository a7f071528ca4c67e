use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult, is_unique_violation};
use crate::models::{
    DATE_FORMAT, DailyGoal, Food, IntakeEntry, Macros, NewDailyGoal, NewFood, NewIntakeEntry,
    StoreCounts,
};

/// Value of `PRAGMA user_version` once the store is fully migrated.
pub const SCHEMA_VERSION: i64 = 1;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const LEGACY_SERVING_COLUMN: &str = "serving_size_g";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS foods (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        calories REAL NOT NULL,
        protein REAL NOT NULL,
        carbs REAL NOT NULL,
        fat REAL NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS daily_goals (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT UNIQUE NOT NULL,
        target_calories REAL NOT NULL,
        target_protein REAL NOT NULL,
        target_carbs REAL NOT NULL,
        target_fat REAL NOT NULL,
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );

    CREATE TABLE IF NOT EXISTS daily_intake (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        date TEXT NOT NULL,
        food_name TEXT NOT NULL,
        portion_description TEXT NOT NULL,
        calories REAL NOT NULL,
        protein REAL NOT NULL,
        carbs REAL NOT NULL,
        fat REAL NOT NULL,
        meal_type TEXT DEFAULT 'other',
        created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
    );";

// Columns shared by every generation of `daily_intake`, in table order.
const INTAKE_CARRIED_COLUMNS: &[&str] = &[
    "id",
    "date",
    "food_name",
    "calories",
    "protein",
    "carbs",
    "fat",
    "meal_type",
    "created_at",
];

const FOOD_COLUMNS: &str = "id, name, calories, protein, carbs, fat, created_at";

const GOAL_COLUMNS: &str =
    "id, date, target_calories, target_protein, target_carbs, target_fat, created_at";

const INTAKE_COLUMNS: &str = "id, date, food_name, portion_description, calories, protein, carbs, \
     fat, COALESCE(meal_type, 'other'), created_at";

/// A single connection to the store.
///
/// Opened per operation and dropped when the operation returns.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a connection without touching the schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Database { conn })
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Run `f` inside a transaction that commits only when `f` succeeds.
    ///
    /// An error drops the transaction, which rolls it back.
    pub fn transaction<T>(
        &self,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Self) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = Transaction::new_unchecked(&self.conn, behavior)?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    /// Create missing tables and upgrade older layouts. Idempotent.
    pub fn migrate(&self) -> StoreResult<()> {
        self.transaction(TransactionBehavior::Immediate, |db| {
            let version: i64 = db
                .conn
                .pragma_query_value(None, "user_version", |row| row.get(0))?;

            db.conn.execute_batch(SCHEMA)?;

            if version < 1 {
                db.upgrade_legacy_intake()?;
            }

            db.conn.execute_batch(
                "CREATE INDEX IF NOT EXISTS idx_daily_intake_date ON daily_intake(date);",
            )?;

            if version < SCHEMA_VERSION {
                db.conn
                    .pragma_update(None, "user_version", SCHEMA_VERSION)?;
                info!(from = version, to = SCHEMA_VERSION, "store schema migrated");
            } else {
                debug!(version, "store schema up to date");
            }
            Ok(())
        })
    }

    /// Older stores recorded `serving_size_g` instead of a portion description.
    ///
    /// The legacy column is NOT NULL, so the table is rebuilt with it nullable
    /// rather than altered in place. Portions already present are kept; missing
    /// ones, and the `'unknown portion'` placeholder an interrupted earlier
    /// upgrade leaves behind, are backfilled from the gram value.
    fn upgrade_legacy_intake(&self) -> StoreResult<()> {
        let columns = self.table_columns("daily_intake")?;
        if !columns.contains(LEGACY_SERVING_COLUMN) {
            return Ok(());
        }

        let carried = INTAKE_CARRIED_COLUMNS
            .iter()
            .copied()
            .filter(|c| columns.contains(*c))
            .collect::<Vec<_>>()
            .join(", ");
        let (portion, unset) = if columns.contains("portion_description") {
            (
                "CASE WHEN portion_description IS NULL OR portion_description = 'unknown portion'
                      THEN COALESCE(serving_size_g || 'g', 'unknown portion')
                      ELSE portion_description END",
                "portion_description IS NULL OR portion_description = 'unknown portion'",
            )
        } else {
            ("COALESCE(serving_size_g || 'g', 'unknown portion')", "1")
        };

        let backfilled: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM daily_intake WHERE {unset}"),
            [],
            |row| row.get(0),
        )?;

        self.conn.execute_batch(&format!(
            "CREATE TABLE daily_intake_migrated (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                food_name TEXT NOT NULL,
                portion_description TEXT NOT NULL,
                calories REAL NOT NULL,
                protein REAL NOT NULL,
                carbs REAL NOT NULL,
                fat REAL NOT NULL,
                meal_type TEXT DEFAULT 'other',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                serving_size_g REAL
             );

             INSERT INTO daily_intake_migrated ({carried}, serving_size_g, portion_description)
             SELECT {carried}, serving_size_g, {portion}
             FROM daily_intake;

             DROP TABLE daily_intake;
             ALTER TABLE daily_intake_migrated RENAME TO daily_intake;"
        ))?;
        info!(rows = backfilled, "rebuilt legacy daily_intake table and backfilled portions");
        Ok(())
    }

    fn table_columns(&self, table: &str) -> StoreResult<BTreeSet<String>> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({table})"))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<BTreeSet<_>>>()?;
        Ok(names)
    }

    // --- Row mapping helpers ---

    fn food_from_row(row: &rusqlite::Row) -> rusqlite::Result<Food> {
        Ok(Food {
            id: row.get(0)?,
            name: row.get(1)?,
            per_100g: Macros::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    }

    fn goal_from_row(row: &rusqlite::Row) -> rusqlite::Result<DailyGoal> {
        Ok(DailyGoal {
            id: row.get(0)?,
            date: row.get(1)?,
            targets: Macros::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
            created_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        })
    }

    fn intake_from_row(row: &rusqlite::Row) -> rusqlite::Result<IntakeEntry> {
        Ok(IntakeEntry {
            id: row.get(0)?,
            date: row.get(1)?,
            food_name: row.get(2)?,
            portion_description: row.get(3)?,
            totals: Macros::new(row.get(4)?, row.get(5)?, row.get(6)?, row.get(7)?),
            meal_type: row.get(8)?,
            created_at: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
        })
    }

    fn now() -> String {
        Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }

    // --- Foods ---

    pub fn insert_food(&self, food: &NewFood) -> StoreResult<Food> {
        let Macros {
            calories,
            protein,
            carbs,
            fat,
        } = food.per_100g;
        self.conn
            .execute(
                "INSERT INTO foods (name, calories, protein, carbs, fat, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![food.name, calories, protein, carbs, fat, Self::now()],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::DuplicateFood(food.name.clone())
                } else {
                    StoreError::Sqlite(e)
                }
            })?;
        let id = self.conn.last_insert_rowid();
        self.get_food_by_id(id)
    }

    pub fn get_food_by_id(&self, id: i64) -> StoreResult<Food> {
        let food = self.conn.query_row(
            &format!("SELECT {FOOD_COLUMNS} FROM foods WHERE id = ?1"),
            params![id],
            Self::food_from_row,
        )?;
        Ok(food)
    }

    pub fn list_foods(&self) -> StoreResult<Vec<Food>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FOOD_COLUMNS} FROM foods ORDER BY name"))?;
        let foods = stmt
            .query_map([], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    /// Foods whose name contains `query`, ASCII case-insensitively.
    pub fn search_foods(&self, query: &str) -> StoreResult<Vec<Food>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FOOD_COLUMNS} FROM foods WHERE name LIKE ?1 ESCAPE '\\' ORDER BY name"
        ))?;
        let foods = stmt
            .query_map(params![pattern], Self::food_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(foods)
    }

    // --- Daily goals ---

    /// Insert the goal for its date, replacing any existing row wholesale.
    pub fn upsert_goal(&self, goal: &NewDailyGoal) -> StoreResult<DailyGoal> {
        let date_str = goal.date.format(DATE_FORMAT).to_string();
        let Macros {
            calories,
            protein,
            carbs,
            fat,
        } = goal.targets;
        self.conn.execute(
            "INSERT OR REPLACE INTO daily_goals
             (date, target_calories, target_protein, target_carbs, target_fat, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![date_str, calories, protein, carbs, fat, Self::now()],
        )?;
        let id = self.conn.last_insert_rowid();
        let goal = self.conn.query_row(
            &format!("SELECT {GOAL_COLUMNS} FROM daily_goals WHERE id = ?1"),
            params![id],
            Self::goal_from_row,
        )?;
        Ok(goal)
    }

    pub fn get_goal(&self, date: NaiveDate) -> StoreResult<Option<DailyGoal>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {GOAL_COLUMNS} FROM daily_goals WHERE date = ?1"
        ))?;
        let mut rows = stmt.query(params![date_str])?;
        if let Some(row) = rows.next()? {
            Ok(Some(Self::goal_from_row(row)?))
        } else {
            Ok(None)
        }
    }

    // --- Intake ---

    pub fn insert_intake(&self, entry: &NewIntakeEntry) -> StoreResult<IntakeEntry> {
        let date_str = entry.date.format(DATE_FORMAT).to_string();
        let Macros {
            calories,
            protein,
            carbs,
            fat,
        } = entry.totals;
        self.conn.execute(
            "INSERT INTO daily_intake
             (date, food_name, portion_description, calories, protein, carbs, fat, meal_type, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                date_str,
                entry.food_name,
                entry.portion_description,
                calories,
                protein,
                carbs,
                fat,
                entry.meal_type.as_str(),
                Self::now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_intake(id)
    }

    pub fn get_intake(&self, id: i64) -> StoreResult<IntakeEntry> {
        let entry = self.conn.query_row(
            &format!("SELECT {INTAKE_COLUMNS} FROM daily_intake WHERE id = ?1"),
            params![id],
            Self::intake_from_row,
        )?;
        Ok(entry)
    }

    /// Entries for `date`, ordered by meal type and then by creation.
    pub fn get_entries_for_date(&self, date: NaiveDate) -> StoreResult<Vec<IntakeEntry>> {
        let date_str = date.format(DATE_FORMAT).to_string();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {INTAKE_COLUMNS} FROM daily_intake
             WHERE date = ?1
             ORDER BY COALESCE(meal_type, 'other'), created_at, id"
        ))?;
        let entries = stmt
            .query_map(params![date_str], Self::intake_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    // --- Stats ---

    pub fn counts(&self) -> StoreResult<StoreCounts> {
        let foods: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM foods", [], |row| row.get(0))?;
        let intake_entries: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM daily_intake", [], |row| row.get(0))?;
        let goal_days: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT date) FROM daily_goals",
            [],
            |row| row.get(0),
        )?;
        Ok(StoreCounts {
            foods,
            intake_entries,
            goal_days,
        })
    }
}
