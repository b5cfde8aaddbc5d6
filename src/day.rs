use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

use crate::err::Error;

/// Half-open `[midnight, next midnight)` interval of one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// The window of `date` in the server's local time zone.
    pub fn local(date: NaiveDate) -> Self {
        Self::in_zone(date, &Local)
    }

    pub fn in_zone<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            start: midnight(date, tz),
            end: midnight(next, tz),
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

// Some zones skip midnight on DST changes; the day then starts at the first
// instant that does exist.
fn midnight<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    (0..3)
        .find_map(|hours| {
            tz.from_local_datetime(&(naive + Duration::hours(hours)))
                .earliest()
        })
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// A class date as received from a client: the instant that gets stored and
/// the calendar day used for duplicate detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassDate {
    pub at: DateTime<Utc>,
    pub day: NaiveDate,
}

impl ClassDate {
    pub fn parse(raw: &str) -> Result<Self, Error> {
        Self::parse_in(raw, &Local)
    }

    /// Accepts `YYYY-MM-DD`, a naive `YYYY-MM-DDTHH:MM:SS[.fff]` read as
    /// local time, or an RFC 3339 timestamp.
    pub fn parse_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Result<Self, Error> {
        let raw = raw.trim();
        let at = if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            stamp.with_timezone(&Utc)
        } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            local_instant(&naive, tz)
        } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            midnight(date, tz)
        } else {
            return Err(Error::invalid(format!("fecha_clase inválida: `{}`", raw)));
        };

        Ok(Self {
            at,
            day: at.with_timezone(tz).date_naive(),
        })
    }

    pub fn window_in<Tz: TimeZone>(&self, tz: &Tz) -> DayWindow {
        DayWindow::in_zone(self.day, tz)
    }

    pub fn window(&self) -> DayWindow {
        self.window_in(&Local)
    }
}

fn local_instant<Tz: TimeZone>(naive: &NaiveDateTime, tz: &Tz) -> DateTime<Utc> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|at| at.with_timezone(&Utc))
        .unwrap_or_else(|| midnight(naive.date(), tz))
}
