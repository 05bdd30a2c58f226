// libs/scheduling-cell/src/services/slots.rs
//
// Pure slot arithmetic. Everything here works on plain `NaiveTime` values so
// availability math stays independent of the store and the HTTP layer.

use std::collections::HashSet;

use chrono::{Duration, NaiveTime};
use thiserror::Error;

/// Bookable start times are generated on this grid.
pub const SLOT_INCREMENT_MINUTES: i64 = 30;

/// Session lengths offered by the booking form.
pub const SUPPORTED_DURATIONS_MINUTES: [i64; 4] = [30, 60, 90, 120];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Unsupported session duration: {0} minutes")]
    UnsupportedDuration(i64),

    #[error("Invalid time value: {0}")]
    InvalidTime(String),
}

/// Parse a wall-clock time as sent by the booking form ("16:30") or stored by
/// PostgREST ("16:30:00").
pub fn parse_time(raw: &str) -> Result<NaiveTime, SlotError> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| SlotError::InvalidTime(raw.to_string()))
}

/// End of a session starting at `start`, minute arithmetic with hour and
/// midnight rollover.
pub fn slot_end(start: NaiveTime, duration_minutes: i64) -> NaiveTime {
    start
        .overflowing_add_signed(Duration::minutes(duration_minutes))
        .0
}

/// The 30-minute increments a reservation blocks. A legacy row without a
/// recorded end time blocks exactly its start increment.
pub fn occupied_increments(start: NaiveTime, end: Option<NaiveTime>) -> Vec<NaiveTime> {
    let mut increments = vec![start];

    if let Some(end) = end {
        let mut current = slot_end(start, SLOT_INCREMENT_MINUTES);
        while current < end {
            increments.push(current);
            current = slot_end(current, SLOT_INCREMENT_MINUTES);
        }
    }

    increments
}

/// Eligible start times inside one availability window.
///
/// A candidate start is kept only if the whole session fits before the window
/// closes and none of the increments it occupies collides with `booked`.
pub fn available_starts(
    window_start: NaiveTime,
    window_end: NaiveTime,
    booked: &HashSet<NaiveTime>,
    duration_minutes: i64,
) -> Result<Vec<NaiveTime>, SlotError> {
    if duration_minutes <= 0 || duration_minutes % SLOT_INCREMENT_MINUTES != 0 {
        return Err(SlotError::UnsupportedDuration(duration_minutes));
    }

    let window_minutes = (window_end - window_start).num_minutes();
    let increments_needed = duration_minutes / SLOT_INCREMENT_MINUTES;

    let mut starts = Vec::new();
    let mut offset = 0;

    while offset + duration_minutes <= window_minutes {
        let candidate = slot_end(window_start, offset);

        let free = (0..increments_needed)
            .map(|i| slot_end(candidate, i * SLOT_INCREMENT_MINUTES))
            .all(|increment| !booked.contains(&increment));

        if free {
            starts.push(candidate);
        }

        offset += SLOT_INCREMENT_MINUTES;
    }

    Ok(starts)
}
