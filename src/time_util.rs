use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

use crate::error::AppError;

/// Fixed civil zone for all temporal comparisons (America/Bogota, no DST).
pub const CIVIL_OFFSET: UtcOffset = time::macros::offset!(-5);

/// Source of "now" in the fixed civil zone. Injected into every engine that
/// applies a time-relative guard so tests can pin the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> PrimitiveDateTime;
}

/// Wall clock translated into the fixed civil zone.
pub struct CivilClock;

impl Clock for CivilClock {
    fn now(&self) -> PrimitiveDateTime {
        let now = OffsetDateTime::now_utc().to_offset(CIVIL_OFFSET);
        PrimitiveDateTime::new(now.date(), now.time())
    }
}

pub fn is_on_the_hour(t: Time) -> bool {
    t.minute() == 0 && t.second() == 0 && t.nanosecond() == 0
}

/// Parse `"H"`, `"HH"`, `"HH:mm"` or `"HH:mm:ss"` into a `Time`.
pub fn parse_hour(raw: &str) -> Result<Time, AppError> {
    let invalid = || AppError::Validation(format!("invalid hour format: '{raw}'"));

    let mut parts = raw.trim().split(':');
    let hour: u8 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(invalid)?;
    let minute: u8 = match parts.next() {
        Some(p) => p.parse().map_err(|_| invalid())?,
        None => 0,
    };
    let second: u8 = match parts.next() {
        Some(p) => p.parse().map_err(|_| invalid())?,
        None => 0,
    };
    if parts.next().is_some() {
        return Err(invalid());
    }

    Time::from_hms(hour, minute, second).map_err(|_| invalid())
}

pub fn datetime(date: Date, time: Time) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, time)
}

/// The hour after `t`, wrapping 23:00 to 00:00.
pub fn hour_after(t: Time) -> Time {
    t + Duration::HOUR
}

/// End instant of the one-hour slot starting at `(date, start)`. A slot
/// starting at 23:00 ends at 00:00 of the next civil day.
pub fn slot_end(date: Date, start: Time) -> PrimitiveDateTime {
    PrimitiveDateTime::new(date, start) + Duration::HOUR
}

#[cfg(test)]
pub struct FixedClock(pub PrimitiveDateTime);

#[cfg(test)]
impl Clock for FixedClock {
    fn now(&self) -> PrimitiveDateTime {
        self.0
    }
}
