use anyhow::Result;

use macro_tracker_core::NutritionStore;
use macro_tracker_core::models::{Macros, NewFood};
use macro_tracker_core::report;

use super::helpers::finish;

pub(crate) fn cmd_food_add(
    store: &NutritionStore,
    name: &str,
    per_100g: Macros,
    json: bool,
) -> Result<()> {
    let food = NewFood {
        name: name.to_string(),
        per_100g,
    };
    finish(store.register_food(&food), report::food_registered, json)
}

pub(crate) fn cmd_food_lookup(store: &NutritionStore, name: Option<&str>, json: bool) -> Result<()> {
    finish(store.lookup_food(name), report::food_lookup, json)
}
