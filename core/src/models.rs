use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const MEAL_TYPES: &[&str] = &["breakfast", "lunch", "dinner", "snack", "other"];

/// Calories plus the three macronutrients.
///
/// Per 100g for a [`Food`], a target for a [`DailyGoal`], and an absolute
/// portion total for an [`IntakeEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl Macros {
    #[must_use]
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories,
            protein,
            carbs,
            fat,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Food {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub per_100g: Macros,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewFood {
    pub name: String,
    pub per_100g: Macros,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyGoal {
    pub id: i64,
    pub date: String,
    #[serde(flatten)]
    pub targets: Macros,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewDailyGoal {
    pub date: NaiveDate,
    pub targets: Macros,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeEntry {
    pub id: i64,
    pub date: String,
    pub food_name: String,
    pub portion_description: String,
    #[serde(flatten)]
    pub totals: Macros,
    // Kept as stored text: rows written by older versions may hold values
    // outside `MealType`.
    pub meal_type: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewIntakeEntry {
    pub date: NaiveDate,
    pub food_name: String,
    pub portion_description: String,
    pub totals: Macros,
    pub meal_type: MealType,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
    #[default]
    Other,
}

impl MealType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snack => "snack",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMealTypeError(String);

impl fmt::Display for ParseMealTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid meal type '{}'. Must be one of: {}",
            self.0,
            MEAL_TYPES.join(", ")
        )
    }
}

impl std::error::Error for ParseMealTypeError {}

impl FromStr for MealType {
    type Err = ParseMealTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(Self::Breakfast),
            "lunch" => Ok(Self::Lunch),
            "dinner" => Ok(Self::Dinner),
            "snack" => Ok(Self::Snack),
            "other" => Ok(Self::Other),
            _ => Err(ParseMealTypeError(s.to_string())),
        }
    }
}

/// Parse `YYYY-MM-DD` or one of `today` / `yesterday` / `tomorrow`.
pub fn parse_day(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    let today = Local::now().date_naive();
    match s.trim() {
        "today" => Ok(today),
        "yesterday" => Ok(today - Duration::days(1)),
        "tomorrow" => Ok(today + Duration::days(1)),
        other => NaiveDate::parse_from_str(other, DATE_FORMAT),
    }
}

#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[derive(Debug, Clone, Serialize)]
pub struct FoodLookup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub foods: Vec<Food>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealGroup {
    pub meal_type: String,
    pub entries: Vec<IntakeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealReview {
    pub date: String,
    pub meals: Vec<MealGroup>,
}

impl MealReview {
    /// Group rows already ordered by meal type into contiguous sections.
    #[must_use]
    pub fn from_ordered(date: String, entries: Vec<IntakeEntry>) -> Self {
        let mut meals: Vec<MealGroup> = Vec::new();
        for entry in entries {
            match meals.last_mut() {
                Some(group) if group.meal_type == entry.meal_type => group.entries.push(entry),
                _ => meals.push(MealGroup {
                    meal_type: entry.meal_type.clone(),
                    entries: vec![entry],
                }),
            }
        }
        Self { date, meals }
    }

    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.meals.iter().map(|m| m.entries.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub foods: i64,
    pub intake_entries: i64,
    pub goal_days: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub location: String,
    pub exists: bool,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contents: Option<StoreCounts>,
}
