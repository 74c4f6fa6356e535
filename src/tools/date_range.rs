//! find_by_date_range - vCon lookup by creation date window
//!
//! Bare dates are widened to the full day on both ends so the range is
//! inclusive. Unparsable bounds yield an empty result with a logged
//! warning, never an error back to the model.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::ToolError;
use crate::store::VconStore;

const TOOL: &str = "find_by_date_range";

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct DateRangeArgs {
    pub start_date: String,
    pub end_date: String,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sort: Option<String>,
}

/// Which end of the range a bound sits on; a bare date widens toward it.
#[derive(Clone, Copy, PartialEq)]
enum Bound {
    Start,
    End,
}

/// Parse an ISO-8601 date or date-time. A bare date becomes the start of
/// that day for the lower bound and 23:59:59.999999 for the upper bound.
fn parse_bound(input: &str, bound: Bound) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let time = match bound {
            Bound::Start => date.and_hms_opt(0, 0, 0)?,
            Bound::End => date.and_hms_micro_opt(23, 59, 59, 999_999)?,
        };
        return Some(Utc.from_utc_datetime(&time));
    }

    None
}

pub async fn execute(args: DateRangeArgs, store: &VconStore<'_>) -> Result<String, ToolError> {
    let (Some(start), Some(end)) = (
        parse_bound(&args.start_date, Bound::Start),
        parse_bound(&args.end_date, Bound::End),
    ) else {
        warn!(
            "{}: unparsable range [{} .. {}], returning no matches",
            TOOL, args.start_date, args.end_date
        );
        return Ok("[]".to_string());
    };

    let mut limit = args.limit.unwrap_or(DEFAULT_LIMIT).max(0);
    if limit > MAX_LIMIT {
        warn!("{}: limit {} capped to {}", TOOL, limit, MAX_LIMIT);
        limit = MAX_LIMIT;
    }
    let offset = args.offset.unwrap_or(0).max(0);

    let newest_first = match args.sort.as_deref() {
        Some("oldest") => false,
        Some("newest") | None => true,
        Some(other) => {
            debug!("{}: unrecognized sort '{}', using newest", TOOL, other);
            true
        }
    };

    let uuids = store
        .find_in_range(start, end, limit, offset, newest_first)
        .await
        .map_err(|e| ToolError::execution(TOOL, e))?;

    debug!("{}: {} match(es) in [{} .. {}]", TOOL, uuids.len(), start, end);
    serde_json::to_string(&uuids).map_err(|e| ToolError::execution(TOOL, e.into()))
}
