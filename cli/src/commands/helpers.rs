use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use serde::Serialize;

use macro_tracker_core::models::{parse_day, today};
use macro_tracker_core::{StoreResult, ToolOutput};

pub(crate) fn parse_date(date_str: Option<&str>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(today()),
        Some(s) => parse_day(s).with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

/// Print an operation outcome as tool text, or as the JSON of its value.
///
/// A failed operation becomes an `Err` so the process exits non-zero.
pub(crate) fn finish<T: Serialize>(
    result: StoreResult<T>,
    render: impl FnOnce(&StoreResult<T>) -> ToolOutput,
    json: bool,
) -> Result<()> {
    if json {
        let value = result?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let output = render(&result);
    if output.is_error {
        bail!("{}", output.text);
    }
    println!("{}", output.text.trim_end());
    Ok(())
}
