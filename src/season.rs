use chrono::{Datelike, NaiveDateTime};

/// Maps a kickoff to the competition-season it belongs to.
pub trait SeasonKey: Send + Sync {
    fn season_of(&self, kickoff: NaiveDateTime) -> i32;
}

/// One season per calendar year.
#[derive(Debug, Clone, Copy, Default)]
pub struct CalendarYear;

impl SeasonKey for CalendarYear {
    fn season_of(&self, kickoff: NaiveDateTime) -> i32 {
        kickoff.year()
    }
}

/// Seasons that start in `start_month` and run into the next year, labelled
/// by the year they start in (August 2024 to May 2025 is season 2024).
#[derive(Debug, Clone, Copy)]
pub struct SplitYear {
    pub start_month: u32,
}

impl SplitYear {
    pub fn new(start_month: u32) -> Self {
        Self {
            start_month: start_month.clamp(1, 12),
        }
    }
}

impl SeasonKey for SplitYear {
    fn season_of(&self, kickoff: NaiveDateTime) -> i32 {
        if kickoff.month() >= self.start_month {
            kickoff.year()
        } else {
            kickoff.year() - 1
        }
    }
}

impl<F> SeasonKey for F
where
    F: Fn(NaiveDateTime) -> i32 + Send + Sync,
{
    fn season_of(&self, kickoff: NaiveDateTime) -> i32 {
        self(kickoff)
    }
}
