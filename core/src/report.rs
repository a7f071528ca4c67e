use std::fmt::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{StoreError, StoreResult};
use crate::models::{
    DATE_FORMAT, DailyGoal, Food, FoodLookup, IntakeEntry, MealReview, StoreInfo,
};

/// Leading marker of every failure text. Success texts never start with it.
pub const FAILURE_MARKER: &str = "❌";

/// Text result of one operation, plus whether it reports a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

fn failure(action: &str, err: &StoreError) -> ToolOutput {
    ToolOutput::failure(format!("{FAILURE_MARKER} Error {action}: {err}"))
}

/// Avoid printing "-0" for values that round to zero.
pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

fn rounded(v: f64, decimals: u8) -> String {
    let scale = 10f64.powi(i32::from(decimals));
    let v = no_neg_zero((v * scale).round() / scale);
    let precision = usize::from(decimals);
    format!("{v:.precision$}")
}

pub fn goal_set(result: &StoreResult<DailyGoal>) -> ToolOutput {
    match result {
        Ok(goal) => {
            let t = &goal.targets;
            ToolOutput::success(format!(
                "✅ Set daily goals for {}:\n🎯 {:?} calories, {:?}g protein, {:?}g carbs, {:?}g fat",
                goal.date, t.calories, t.protein, t.carbs, t.fat
            ))
        }
        Err(e) => failure("setting goals", e),
    }
}

pub fn goal_for_day(date: NaiveDate, result: &StoreResult<Option<DailyGoal>>) -> ToolOutput {
    let day = date.format(DATE_FORMAT);
    match result {
        Ok(Some(goal)) => {
            let t = &goal.targets;
            ToolOutput::success(format!(
                "🎯 Goals for {day}: {:?} calories, {:?}g protein, {:?}g carbs, {:?}g fat",
                t.calories, t.protein, t.carbs, t.fat
            ))
        }
        Ok(None) => ToolOutput::success(format!("📝 No goals set for {day}")),
        Err(e) => failure("reading goals", e),
    }
}

pub fn food_registered(result: &StoreResult<Food>) -> ToolOutput {
    match result {
        Ok(food) => {
            let m = &food.per_100g;
            ToolOutput::success(format!(
                "✅ Added {} to food database\nReference values per 100g: {:?} cal, {:?}g protein, {:?}g carbs, {:?}g fat",
                food.name, m.calories, m.protein, m.carbs, m.fat
            ))
        }
        Err(e @ StoreError::DuplicateFood(_)) => ToolOutput::failure(format!("{FAILURE_MARKER} {e}")),
        Err(e) => failure("adding food", e),
    }
}

pub fn food_lookup(result: &StoreResult<FoodLookup>) -> ToolOutput {
    let lookup = match result {
        Ok(lookup) => lookup,
        Err(e) => return failure("looking up foods", e),
    };

    if lookup.foods.is_empty() {
        return ToolOutput::success(match &lookup.query {
            Some(q) => format!("🔍 No foods found matching '{q}'"),
            None => {
                "📝 No foods in database yet. Use add_food_to_database to add some.".to_string()
            }
        });
    }

    let mut out = String::from("🍎 Food Database (per 100g)\n");
    out.push_str(&"=".repeat(30));
    out.push('\n');
    for food in &lookup.foods {
        let m = &food.per_100g;
        let _ = writeln!(
            out,
            "• {}: {:?}cal, {:?}g protein, {:?}g carbs, {:?}g fat",
            food.name, m.calories, m.protein, m.carbs, m.fat
        );
    }
    ToolOutput::success(out)
}

pub fn intake_logged(result: &StoreResult<IntakeEntry>) -> ToolOutput {
    match result {
        Ok(entry) => {
            let t = &entry.totals;
            ToolOutput::success(format!(
                "✅ Logged {} of {} for {}\nAdded: {} cal, {}g protein, {}g carbs, {}g fat",
                entry.portion_description,
                entry.food_name,
                entry.meal_type,
                rounded(t.calories, 0),
                rounded(t.protein, 1),
                rounded(t.carbs, 1),
                rounded(t.fat, 1),
            ))
        }
        Err(e) => failure("logging food", e),
    }
}

pub fn store_info(result: &StoreResult<StoreInfo>) -> ToolOutput {
    let info = match result {
        Ok(info) => info,
        Err(e) => return failure("getting database info", e),
    };

    let mut out = String::from("📁 Database Information\n");
    out.push_str(&"=".repeat(25));
    out.push('\n');
    let _ = writeln!(out, "Location: {}", info.location);
    let _ = writeln!(
        out,
        "Exists: {}",
        if info.exists { "✅ Yes" } else { "❌ No" }
    );

    if info.exists {
        let _ = writeln!(out, "Size: {} bytes", info.size_bytes);
    }
    if let Some(counts) = &info.contents {
        out.push_str("\n📊 Contents:\n");
        let _ = writeln!(out, "• {} foods in database", counts.foods);
        let _ = writeln!(out, "• {} food entries logged", counts.intake_entries);
        let _ = writeln!(out, "• {} days with goals set", counts.goal_days);
    }
    ToolOutput::success(out)
}

pub fn meal_review(result: &StoreResult<MealReview>) -> ToolOutput {
    let review = match result {
        Ok(review) => review,
        Err(e) => return failure("reviewing meals", e),
    };

    if review.is_empty() {
        return ToolOutput::success(format!("🍽️ No meals logged for {}", review.date));
    }

    let mut out = format!("🍽️ Meals for {}\n", review.date);
    out.push_str(&"=".repeat(30));
    out.push_str("\n\n");
    for group in &review.meals {
        let _ = writeln!(out, "🍽️ {}", group.meal_type.to_uppercase());
        out.push_str(&"-".repeat(15));
        out.push('\n');
        for entry in &group.entries {
            let t = &entry.totals;
            let _ = writeln!(out, "• {} {}", entry.portion_description, entry.food_name);
            let _ = writeln!(
                out,
                "  {} cal | {}g protein | {}g carbs | {}g fat\n",
                rounded(t.calories, 0),
                rounded(t.protein, 1),
                rounded(t.carbs, 1),
                rounded(t.fat, 1),
            );
        }
    }
    ToolOutput::success(out)
}
