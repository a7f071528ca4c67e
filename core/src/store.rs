use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rusqlite::TransactionBehavior;
use tracing::{debug, info};

use crate::db::Database;
use crate::error::StoreResult;
use crate::models::{
    DATE_FORMAT, DailyGoal, Food, FoodLookup, IntakeEntry, MealReview, NewDailyGoal, NewFood,
    NewIntakeEntry, StoreInfo,
};

/// Where the store lives. Injected at startup rather than hard-coded.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// The nutrition store.
///
/// Holds no connection of its own: every operation opens one, runs a single
/// transaction, and drops it before returning. Cloning is cheap and clones
/// may be used from several threads at once; SQLite's locking serializes
/// conflicting writes.
#[derive(Debug, Clone)]
pub struct NutritionStore {
    config: StoreConfig,
}

impl NutritionStore {
    /// A handle that has not touched the filesystem yet.
    ///
    /// Call [`NutritionStore::initialize`] (or use [`NutritionStore::open`])
    /// before any operation other than [`NutritionStore::store_info`].
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Create a handle and initialize the store it points at.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        let store = Self::new(config);
        store.initialize()?;
        Ok(store)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Create the store file and tables if missing and run pending migrations.
    pub fn initialize(&self) -> StoreResult<()> {
        if let Some(parent) = self.config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = self.connect()?;
        db.migrate()?;
        info!(path = %self.config.path.display(), "nutrition store ready");
        Ok(())
    }

    fn connect(&self) -> StoreResult<Database> {
        Database::open(&self.config.path)
    }

    fn write<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        self.connect()?.transaction(TransactionBehavior::Immediate, f)
    }

    fn read<T>(&self, f: impl FnOnce(&Database) -> StoreResult<T>) -> StoreResult<T> {
        self.connect()?.transaction(TransactionBehavior::Deferred, f)
    }

    // --- Operations ---

    pub fn set_daily_goal(&self, goal: &NewDailyGoal) -> StoreResult<DailyGoal> {
        let stored = self.write(|db| db.upsert_goal(goal))?;
        debug!(date = %stored.date, "daily goal set");
        Ok(stored)
    }

    pub fn daily_goal(&self, date: NaiveDate) -> StoreResult<Option<DailyGoal>> {
        self.read(|db| db.get_goal(date))
    }

    pub fn register_food(&self, food: &NewFood) -> StoreResult<Food> {
        let stored = self.write(|db| db.insert_food(food))?;
        debug!(id = stored.id, name = %stored.name, "food registered");
        Ok(stored)
    }

    /// All foods when `name` is `None` or empty, otherwise the substring matches.
    pub fn lookup_food(&self, name: Option<&str>) -> StoreResult<FoodLookup> {
        let query = name.filter(|n| !n.is_empty());
        let foods = self.read(|db| match query {
            Some(q) => db.search_foods(q),
            None => db.list_foods(),
        })?;
        Ok(FoodLookup {
            query: query.map(str::to_string),
            foods,
        })
    }

    pub fn log_intake(&self, entry: &NewIntakeEntry) -> StoreResult<IntakeEntry> {
        let stored = self.write(|db| db.insert_intake(entry))?;
        debug!(id = stored.id, date = %stored.date, meal = %stored.meal_type, "intake logged");
        Ok(stored)
    }

    /// Location, size, and row counts. Never creates the store file.
    pub fn store_info(&self) -> StoreResult<StoreInfo> {
        let location = self.config.path.display().to_string();
        if !self.config.path.exists() {
            return Ok(StoreInfo {
                location,
                exists: false,
                size_bytes: 0,
                contents: None,
            });
        }

        let size_bytes = std::fs::metadata(&self.config.path)?.len();
        let counts = self.read(Database::counts)?;
        Ok(StoreInfo {
            location,
            exists: true,
            size_bytes,
            contents: Some(counts),
        })
    }

    pub fn review_meals(&self, date: NaiveDate) -> StoreResult<MealReview> {
        let entries = self.read(|db| db.get_entries_for_date(date))?;
        Ok(MealReview::from_ordered(
            date.format(DATE_FORMAT).to_string(),
            entries,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Macros, MealType, StoreCounts};
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, NutritionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = NutritionStore::open(StoreConfig::new(dir.path().join("macros.db"))).unwrap();
        (dir, store)
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn intake(food_name: &str, meal_type: MealType) -> NewIntakeEntry {
        NewIntakeEntry {
            date: day(),
            food_name: food_name.to_string(),
            portion_description: "1 serving".to_string(),
            totals: Macros::new(100.0, 5.0, 10.0, 2.5),
            meal_type,
        }
    }

    #[test]
    fn test_initialize_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("macros.db");
        let store = NutritionStore::open(StoreConfig::new(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_initialize_twice_keeps_rows() {
        let (dir, store) = temp_store();
        store.log_intake(&intake("oats", MealType::Breakfast)).unwrap();
        let before = store.review_meals(day()).unwrap();

        let reopened = NutritionStore::open(StoreConfig::new(dir.path().join("macros.db"))).unwrap();
        let after = reopened.review_meals(day()).unwrap();
        assert_eq!(after.entry_count(), 1);
        assert_eq!(
            before.meals[0].entries[0].created_at,
            after.meals[0].entries[0].created_at
        );
    }

    #[test]
    fn test_register_food_then_lookup() {
        let (_dir, store) = temp_store();
        let food = store
            .register_food(&NewFood {
                name: "banana".to_string(),
                per_100g: Macros::new(89.0, 1.1, 23.0, 0.3),
            })
            .unwrap();
        assert_eq!(food.name, "banana");

        let err = store
            .register_food(&NewFood {
                name: "banana".to_string(),
                per_100g: Macros::new(1.0, 1.0, 1.0, 1.0),
            })
            .unwrap_err();
        assert!(err.is_duplicate());

        let found = store.lookup_food(Some("banana")).unwrap();
        assert_eq!(found.query.as_deref(), Some("banana"));
        assert_eq!(found.foods.len(), 1);
        assert_eq!(found.foods[0].per_100g, Macros::new(89.0, 1.1, 23.0, 0.3));
    }

    #[test]
    fn test_lookup_without_name_lists_everything() {
        let (_dir, store) = temp_store();
        for name in ["rice", "apple", "milk"] {
            store
                .register_food(&NewFood {
                    name: name.to_string(),
                    per_100g: Macros::new(50.0, 1.0, 1.0, 1.0),
                })
                .unwrap();
        }

        for query in [None, Some("")] {
            let all = store.lookup_food(query).unwrap();
            assert!(all.query.is_none());
            let names: Vec<&str> = all.foods.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, ["apple", "milk", "rice"]);
        }

        let subset = store.lookup_food(Some("i")).unwrap();
        let names: Vec<&str> = subset.foods.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["milk", "rice"]);
    }

    #[test]
    fn test_set_goal_twice_last_wins() {
        let (_dir, store) = temp_store();
        store
            .set_daily_goal(&NewDailyGoal {
                date: day(),
                targets: Macros::new(2000.0, 150.0, 250.0, 70.0),
            })
            .unwrap();
        store
            .set_daily_goal(&NewDailyGoal {
                date: day(),
                targets: Macros::new(1500.0, 120.0, 100.0, 50.0),
            })
            .unwrap();

        let goal = store.daily_goal(day()).unwrap().unwrap();
        assert_eq!(goal.targets, Macros::new(1500.0, 120.0, 100.0, 50.0));
        assert_eq!(store.store_info().unwrap().contents.unwrap().goal_days, 1);
    }

    #[test]
    fn test_review_meals_groups_in_insertion_order() {
        let (_dir, store) = temp_store();
        let logged = [
            ("nuts", MealType::Snack),
            ("eggs", MealType::Breakfast),
            ("salad", MealType::Lunch),
            ("toast", MealType::Breakfast),
            ("apple", MealType::Snack),
            ("coffee", MealType::Breakfast),
        ];
        for (food, meal) in logged {
            store.log_intake(&intake(food, meal)).unwrap();
        }

        let review = store.review_meals(day()).unwrap();
        assert_eq!(review.date, "2024-06-15");
        assert_eq!(review.entry_count(), logged.len());

        let sections: Vec<(&str, Vec<&str>)> = review
            .meals
            .iter()
            .map(|m| {
                (
                    m.meal_type.as_str(),
                    m.entries.iter().map(|e| e.food_name.as_str()).collect(),
                )
            })
            .collect();
        assert_eq!(
            sections,
            [
                ("breakfast", vec!["eggs", "toast", "coffee"]),
                ("lunch", vec!["salad"]),
                ("snack", vec!["nuts", "apple"]),
            ]
        );
    }

    #[test]
    fn test_review_meals_empty_day() {
        let (_dir, store) = temp_store();
        store.log_intake(&intake("eggs", MealType::Breakfast)).unwrap();
        let review = store.review_meals(day().succ_opt().unwrap()).unwrap();
        assert!(review.is_empty());
        assert_eq!(review.date, "2024-06-16");
    }

    #[test]
    fn test_log_intake_keeps_full_precision() {
        let (_dir, store) = temp_store();
        let entry = store
            .log_intake(&NewIntakeEntry {
                totals: Macros::new(123.456, 7.891, 0.05, 12.349),
                portion_description: "1 medium apple".to_string(),
                ..intake("apple", MealType::Other)
            })
            .unwrap();
        assert_eq!(entry.meal_type, "other");

        let review = store.review_meals(day()).unwrap();
        let stored = &review.meals[0].entries[0];
        assert_eq!(stored.totals, Macros::new(123.456, 7.891, 0.05, 12.349));
        assert_eq!(stored.portion_description, "1 medium apple");
    }

    #[test]
    fn test_store_info_fresh_path_does_not_create_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("never.db");
        let store = NutritionStore::new(StoreConfig::new(&path));

        let info = store.store_info().unwrap();
        assert!(!info.exists);
        assert_eq!(info.size_bytes, 0);
        assert!(info.contents.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_store_info_after_writes() {
        let (_dir, store) = temp_store();
        store
            .register_food(&NewFood {
                name: "banana".to_string(),
                per_100g: Macros::new(89.0, 1.1, 23.0, 0.3),
            })
            .unwrap();
        store.log_intake(&intake("banana", MealType::Snack)).unwrap();
        store.log_intake(&intake("banana", MealType::Snack)).unwrap();
        store
            .set_daily_goal(&NewDailyGoal {
                date: day(),
                targets: Macros::new(2000.0, 150.0, 250.0, 70.0),
            })
            .unwrap();

        let info = store.store_info().unwrap();
        assert!(info.exists);
        assert!(info.size_bytes > 0);
        assert_eq!(
            info.contents,
            Some(StoreCounts {
                foods: 1,
                intake_entries: 2,
                goal_days: 1
            })
        );
    }

    #[test]
    fn test_operation_on_unreadable_store_reports_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = NutritionStore::new(StoreConfig::new(dir.path()));
        let err = store.review_meals(day()).unwrap_err();
        assert!(!err.is_duplicate());
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_concurrent_goal_writes_keep_one_full_payload() {
        let (_dir, store) = temp_store();
        let payloads = [
            Macros::new(2000.0, 150.0, 250.0, 70.0),
            Macros::new(1500.0, 120.0, 100.0, 50.0),
        ];

        std::thread::scope(|scope| {
            for targets in payloads {
                let store = store.clone();
                scope.spawn(move || {
                    for _ in 0..10 {
                        store
                            .set_daily_goal(&NewDailyGoal {
                                date: day(),
                                targets,
                            })
                            .unwrap();
                    }
                });
            }
        });

        let goal = store.daily_goal(day()).unwrap().unwrap();
        assert!(payloads.contains(&goal.targets));
        assert_eq!(store.store_info().unwrap().contents.unwrap().goal_days, 1);
    }
}
