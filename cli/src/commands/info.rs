use anyhow::Result;

use macro_tracker_core::NutritionStore;
use macro_tracker_core::report;

use super::helpers::finish;

/// Never initializes the store, so a missing file is reported rather than created.
pub(crate) fn cmd_info(store: &NutritionStore, json: bool) -> Result<()> {
    finish(store.store_info(), report::store_info, json)
}
