use anyhow::Result;

use macro_tracker_core::NutritionStore;
use macro_tracker_core::models::{Macros, NewDailyGoal};
use macro_tracker_core::report;

use super::helpers::{finish, parse_date};

pub(crate) fn cmd_goal_set(
    store: &NutritionStore,
    targets: Macros,
    date: Option<&str>,
    json: bool,
) -> Result<()> {
    let goal = NewDailyGoal {
        date: parse_date(date)?,
        targets,
    };
    finish(store.set_daily_goal(&goal), report::goal_set, json)
}

pub(crate) fn cmd_goal_show(store: &NutritionStore, date: Option<&str>, json: bool) -> Result<()> {
    let date = parse_date(date)?;
    finish(
        store.daily_goal(date),
        |result| report::goal_for_day(date, result),
        json,
    )
}
