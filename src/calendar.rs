use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPeriod {
    Morning,
    Afternoon,
    Night,
}

impl MatchPeriod {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=11 => MatchPeriod::Morning,
            12..=17 => MatchPeriod::Afternoon,
            _ => MatchPeriod::Night,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchPeriod::Morning => "morning",
            MatchPeriod::Afternoon => "afternoon",
            MatchPeriod::Night => "night",
        }
    }
}

/// Kickoff-derived columns; they describe the fixture itself, not results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFeatures {
    pub is_weekend: bool,
    pub period: MatchPeriod,
    pub weekday: Weekday,
}

impl CalendarFeatures {
    pub fn from_kickoff(kickoff: NaiveDateTime) -> Self {
        let weekday = kickoff.weekday();
        Self {
            is_weekend: matches!(weekday, Weekday::Sat | Weekday::Sun),
            period: MatchPeriod::from_hour(kickoff.hour()),
            weekday,
        }
    }

    pub fn day_of_week(&self) -> &'static str {
        match self.weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}
