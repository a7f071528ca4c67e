use anyhow::Result;

use macro_tracker_core::NutritionStore;
use macro_tracker_core::models::{Macros, MealType, NewIntakeEntry};
use macro_tracker_core::report;

use super::helpers::{finish, parse_date};

pub(crate) fn cmd_log(
    store: &NutritionStore,
    food_name: &str,
    portion: &str,
    totals: Macros,
    meal_type: MealType,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let entry = NewIntakeEntry {
        date: parse_date(date)?,
        food_name: food_name.to_string(),
        portion_description: portion.to_string(),
        totals,
        meal_type,
    };
    finish(store.log_intake(&entry), report::intake_logged, json)
}

pub(crate) fn cmd_meals(store: &NutritionStore, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    finish(store.review_meals(date), report::meal_review, json)
}
