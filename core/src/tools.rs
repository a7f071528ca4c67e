use std::str::FromStr;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

use crate::models::{Macros, MealType, NewDailyGoal, NewFood, NewIntakeEntry, parse_day, today};
use crate::report::{self, ToolOutput};
use crate::store::NutritionStore;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: &'static str, message: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// The store operations as named tools with JSON arguments and text results.
///
/// Transports only move JSON around; argument decoding and the mapping from
/// store outcomes to text both live in this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    SetDailyGoals,
    AddFoodToDatabase,
    LookupFood,
    LogFoodIntake,
    GetDatabaseInfo,
    ReviewMeals,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::SetDailyGoals,
        Tool::AddFoodToDatabase,
        Tool::LookupFood,
        Tool::LogFoodIntake,
        Tool::GetDatabaseInfo,
        Tool::ReviewMeals,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::SetDailyGoals => "set_daily_goals",
            Self::AddFoodToDatabase => "add_food_to_database",
            Self::LookupFood => "lookup_food",
            Self::LogFoodIntake => "log_food_intake",
            Self::GetDatabaseInfo => "get_database_info",
            Self::ReviewMeals => "review_meals",
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::SetDailyGoals => {
                "Set daily macro goals. Replaces any goals already set for that date."
            }
            Self::AddFoodToDatabase => {
                "Add a new food to the reference database for future lookups. Values are per 100g."
            }
            Self::LookupFood => {
                "Look up foods in the database for macro reference. Without a name, lists every food."
            }
            Self::LogFoodIntake => "Log food intake with already calculated macros for the portion.",
            Self::GetDatabaseInfo => "Get information about the database location and status.",
            Self::ReviewMeals => "Review all meals logged for a specific day, grouped by meal type.",
        }
    }

    #[must_use]
    pub fn input_schema(self) -> Value {
        let date = json!({
            "type": "string",
            "description": "Date in YYYY-MM-DD format (optional, defaults to today)"
        });
        match self {
            Self::SetDailyGoals => json!({
                "type": "object",
                "properties": {
                    "target_calories": { "type": "number", "description": "Target calories for the day" },
                    "target_protein": { "type": "number", "description": "Target protein in grams" },
                    "target_carbs": { "type": "number", "description": "Target carbohydrates in grams" },
                    "target_fat": { "type": "number", "description": "Target fat in grams" },
                    "date_str": date
                },
                "required": ["target_calories", "target_protein", "target_carbs", "target_fat"]
            }),
            Self::AddFoodToDatabase => json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name of the food" },
                    "calories": { "type": "number", "description": "Calories per 100g" },
                    "protein": { "type": "number", "description": "Protein in grams per 100g" },
                    "carbs": { "type": "number", "description": "Carbohydrates in grams per 100g" },
                    "fat": { "type": "number", "description": "Fat in grams per 100g" }
                },
                "required": ["name", "calories", "protein", "carbs", "fat"]
            }),
            Self::LookupFood => json!({
                "type": "object",
                "properties": {
                    "name": {
                        "type": "string",
                        "description": "Food name or part of one (optional, lists all foods when omitted)"
                    }
                }
            }),
            Self::LogFoodIntake => json!({
                "type": "object",
                "properties": {
                    "food_name": { "type": "string", "description": "Name of the food eaten" },
                    "calories": { "type": "number", "description": "Total calories for this portion" },
                    "protein": { "type": "number", "description": "Total protein in grams for this portion" },
                    "carbs": { "type": "number", "description": "Total carbs in grams for this portion" },
                    "fat": { "type": "number", "description": "Total fat in grams for this portion" },
                    "portion_description": {
                        "type": "string",
                        "description": "Description of portion (e.g. \"200g\", \"1 cup\", \"1 medium apple\")"
                    },
                    "meal_type": {
                        "type": "string",
                        "enum": crate::models::MEAL_TYPES,
                        "default": "other",
                        "description": "Type of meal"
                    },
                    "date_str": date
                },
                "required": ["food_name", "calories", "protein", "carbs", "fat", "portion_description"]
            }),
            Self::GetDatabaseInfo => json!({ "type": "object", "properties": {} }),
            Self::ReviewMeals => json!({
                "type": "object",
                "properties": { "date_str": date }
            }),
        }
    }

    #[must_use]
    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    Tool::ALL.into_iter().map(Tool::definition).collect()
}

// --- Arguments ---

#[derive(Deserialize)]
struct SetDailyGoalsArgs {
    target_calories: f64,
    target_protein: f64,
    target_carbs: f64,
    target_fat: f64,
    date_str: Option<String>,
}

#[derive(Deserialize)]
struct AddFoodArgs {
    name: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
}

#[derive(Deserialize)]
struct LookupFoodArgs {
    name: Option<String>,
}

#[derive(Deserialize)]
struct LogFoodIntakeArgs {
    food_name: String,
    calories: f64,
    protein: f64,
    carbs: f64,
    fat: f64,
    portion_description: String,
    meal_type: Option<String>,
    date_str: Option<String>,
}

#[derive(Deserialize)]
struct ReviewMealsArgs {
    date_str: Option<String>,
}

fn decode<T: DeserializeOwned>(tool: Tool, arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.name(),
        message: e.to_string(),
    })
}

fn resolve_date(tool: Tool, date_str: Option<&str>) -> Result<NaiveDate, ToolError> {
    match date_str.map(str::trim) {
        None | Some("") => Ok(today()),
        Some(s) => parse_day(s).map_err(|_| ToolError::InvalidArguments {
            tool: tool.name(),
            message: format!("Invalid date '{s}'. Use YYYY-MM-DD"),
        }),
    }
}

fn resolve_meal_type(tool: Tool, meal_type: Option<&str>) -> Result<MealType, ToolError> {
    match meal_type {
        None => Ok(MealType::default()),
        Some(s) => s.parse().map_err(|e: crate::models::ParseMealTypeError| {
            ToolError::InvalidArguments {
                tool: tool.name(),
                message: e.to_string(),
            }
        }),
    }
}

/// Decode `arguments` for the tool called `name` and run it against `store`.
///
/// Store failures come back as an `Ok` output flagged `is_error`; only
/// unknown tools and undecodable arguments are `Err`.
pub fn call_tool(
    store: &NutritionStore,
    name: &str,
    arguments: Value,
) -> Result<ToolOutput, ToolError> {
    let tool: Tool = name.parse()?;
    debug!(tool = tool.name(), "calling tool");

    let output = match tool {
        Tool::SetDailyGoals => {
            let args: SetDailyGoalsArgs = decode(tool, arguments)?;
            let goal = NewDailyGoal {
                date: resolve_date(tool, args.date_str.as_deref())?,
                targets: Macros::new(
                    args.target_calories,
                    args.target_protein,
                    args.target_carbs,
                    args.target_fat,
                ),
            };
            report::goal_set(&store.set_daily_goal(&goal))
        }
        Tool::AddFoodToDatabase => {
            let args: AddFoodArgs = decode(tool, arguments)?;
            let food = NewFood {
                name: args.name,
                per_100g: Macros::new(args.calories, args.protein, args.carbs, args.fat),
            };
            report::food_registered(&store.register_food(&food))
        }
        Tool::LookupFood => {
            let args: LookupFoodArgs = decode(tool, arguments)?;
            report::food_lookup(&store.lookup_food(args.name.as_deref()))
        }
        Tool::LogFoodIntake => {
            let args: LogFoodIntakeArgs = decode(tool, arguments)?;
            let entry = NewIntakeEntry {
                date: resolve_date(tool, args.date_str.as_deref())?,
                food_name: args.food_name,
                portion_description: args.portion_description,
                totals: Macros::new(args.calories, args.protein, args.carbs, args.fat),
                meal_type: resolve_meal_type(tool, args.meal_type.as_deref())?,
            };
            report::intake_logged(&store.log_intake(&entry))
        }
        Tool::GetDatabaseInfo => report::store_info(&store.store_info()),
        Tool::ReviewMeals => {
            let args: ReviewMealsArgs = decode(tool, arguments)?;
            let date = resolve_date(tool, args.date_str.as_deref())?;
            report::meal_review(&store.review_meals(date))
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DATE_FORMAT;
    use crate::report::FAILURE_MARKER;
    use crate::store::StoreConfig;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, NutritionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = NutritionStore::open(StoreConfig::new(dir.path().join("macros.db"))).unwrap();
        (dir, store)
    }

    fn call(store: &NutritionStore, name: &str, arguments: Value) -> ToolOutput {
        call_tool(store, name, arguments).unwrap()
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs.iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "set_daily_goals",
                "add_food_to_database",
                "lookup_food",
                "log_food_intake",
                "get_database_info",
                "review_meals"
            ]
        );
        for def in &defs {
            assert_eq!(def.input_schema["type"], "object");
            assert!(!def.description.is_empty());
            assert_eq!(def.name.parse::<Tool>().unwrap().name(), def.name);
        }
        let value = serde_json::to_value(&defs[0]).unwrap();
        assert!(value.get("inputSchema").is_some());
    }

    #[test]
    fn test_unknown_tool() {
        let (_dir, store) = temp_store();
        let err = call_tool(&store, "delete_everything", json!({})).unwrap_err();
        assert_eq!(err, ToolError::UnknownTool("delete_everything".to_string()));
    }

    #[test]
    fn test_missing_required_argument() {
        let (_dir, store) = temp_store();
        let err = call_tool(&store, "add_food_to_database", json!({ "name": "kiwi" })).unwrap_err();
        assert!(matches!(
            err,
            ToolError::InvalidArguments {
                tool: "add_food_to_database",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_date_and_meal_type() {
        let (_dir, store) = temp_store();
        let err = call_tool(&store, "review_meals", json!({ "date_str": "15/06/2024" })).unwrap_err();
        assert!(err.to_string().contains("15/06/2024"));

        let err = call_tool(
            &store,
            "log_food_intake",
            json!({
                "food_name": "toast", "calories": 80, "protein": 3, "carbs": 15, "fat": 1,
                "portion_description": "1 slice", "meal_type": "brunch"
            }),
        )
        .unwrap_err();
        assert!(err.to_string().contains("brunch"));
    }

    #[test]
    fn test_banana_scenario() {
        let (_dir, store) = temp_store();
        let day = "2024-06-15";

        let added = call(
            &store,
            "add_food_to_database",
            json!({ "name": "banana", "calories": 89, "protein": 1.1, "carbs": 23, "fat": 0.3 }),
        );
        assert!(!added.is_error);
        assert!(added.text.starts_with("✅"));
        assert!(added.text.contains("banana"));

        let again = call(
            &store,
            "add_food_to_database",
            json!({ "name": "banana", "calories": 89, "protein": 1.1, "carbs": 23, "fat": 0.3 }),
        );
        assert!(again.is_error);
        assert!(again.text.starts_with(FAILURE_MARKER));
        assert!(again.text.contains("already exists"));

        let goals = call(
            &store,
            "set_daily_goals",
            json!({
                "target_calories": 2000, "target_protein": 150,
                "target_carbs": 250, "target_fat": 70, "date_str": day
            }),
        );
        assert!(!goals.is_error);
        assert!(goals.text.contains(day));

        let logged = call(
            &store,
            "log_food_intake",
            json!({
                "food_name": "banana", "calories": 89, "protein": 1.1, "carbs": 23, "fat": 0.3,
                "portion_description": "1 medium", "meal_type": "snack", "date_str": day
            }),
        );
        assert!(!logged.is_error);
        assert!(logged.text.contains("Added: 89 cal, 1.1g protein, 23.0g carbs, 0.3g fat"));

        let review = call(&store, "review_meals", json!({ "date_str": day }));
        assert!(!review.is_error);
        assert_eq!(review.text.matches("🍽️ SNACK").count(), 1);
        assert_eq!(review.text.matches("• ").count(), 1);
        assert!(review.text.contains("• 1 medium banana\n  89 cal"));
    }

    #[test]
    fn test_lookup_food_listing() {
        let (_dir, store) = temp_store();
        let empty = call(&store, "lookup_food", Value::Null);
        assert!(empty.text.contains("No foods in database yet"));

        for (name, calories) in [("rice", 130), ("banana", 89)] {
            call(
                &store,
                "add_food_to_database",
                json!({ "name": name, "calories": calories, "protein": 1, "carbs": 20, "fat": 0.5 }),
            );
        }

        let all = call(&store, "lookup_food", json!({}));
        let banana_at = all.text.find("• banana").unwrap();
        let rice_at = all.text.find("• rice").unwrap();
        assert!(banana_at < rice_at);

        let matched = call(&store, "lookup_food", json!({ "name": "ANA" }));
        assert!(matched.text.contains("• banana: 89.0cal"));
        assert!(!matched.text.contains("rice"));

        let missing = call(&store, "lookup_food", json!({ "name": "kiwi" }));
        assert!(!missing.is_error);
        assert_eq!(missing.text, "🔍 No foods found matching 'kiwi'");
    }

    #[test]
    fn test_defaults_to_today_and_other() {
        let (_dir, store) = temp_store();
        let logged = call(
            &store,
            "log_food_intake",
            json!({
                "food_name": "apple", "calories": 95, "protein": 0.5, "carbs": 25, "fat": 0.3,
                "portion_description": "1 medium apple"
            }),
        );
        assert!(logged.text.contains("for other"));

        let review = call(&store, "review_meals", json!({}));
        assert!(review.text.contains(&today().format(DATE_FORMAT).to_string()));
        assert!(review.text.contains("🍽️ OTHER"));
    }

    #[test]
    fn test_database_info_counts() {
        let (_dir, store) = temp_store();
        call(
            &store,
            "set_daily_goals",
            json!({ "target_calories": 0, "target_protein": -1, "target_carbs": 0, "target_fat": 0 }),
        );
        let info = call(&store, "get_database_info", Value::Null);
        assert!(!info.is_error);
        assert!(info.text.contains("Exists: ✅ Yes"));
        assert!(info.text.contains("• 0 foods in database"));
        assert!(info.text.contains("• 1 days with goals set"));
    }
}
