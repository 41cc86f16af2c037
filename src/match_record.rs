use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Timestamp layouts accepted for `match_date`, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

pub const KICKOFF_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Home,
    Draw,
    Away,
}

impl Outcome {
    pub fn from_goals(home_goals: u32, away_goals: u32) -> Self {
        if home_goals > away_goals {
            Outcome::Home
        } else if home_goals < away_goals {
            Outcome::Away
        } else {
            Outcome::Draw
        }
    }

    /// Value used in the `winning_team` column.
    pub fn as_winning_team(self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Draw => "draw",
            Outcome::Away => "guest",
        }
    }

    pub fn parse_winning_team(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "h" => Some(Outcome::Home),
            "guest" | "away" | "a" => Some(Outcome::Away),
            "draw" | "d" => Some(Outcome::Draw),
            _ => None,
        }
    }

    /// Result of the match from the point of view of one side.
    pub fn for_side(self, side: Side) -> TeamResult {
        match (self, side) {
            (Outcome::Draw, _) => TeamResult::Draw,
            (Outcome::Home, Side::Home) | (Outcome::Away, Side::Guest) => TeamResult::Win,
            (Outcome::Home, Side::Guest) | (Outcome::Away, Side::Home) => TeamResult::Loss,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Home,
    Guest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamResult {
    Win,
    Draw,
    Loss,
}

impl TeamResult {
    pub fn points(self) -> u32 {
        match self {
            TeamResult::Win => 3,
            TeamResult::Draw => 1,
            TeamResult::Loss => 0,
        }
    }
}

/// One played or scheduled fixture.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    /// Position of the row in the input table.
    pub match_id: usize,
    /// Explicit `season`/`year` column, used only when kickoff is missing.
    pub fallback_season: Option<i32>,
    pub kickoff: Option<NaiveDateTime>,
    /// Original text of `match_date` when it could not be parsed.
    pub kickoff_raw: Option<String>,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: Option<u32>,
    pub away_goals: Option<u32>,
    pub result: Option<Outcome>,
    pub round: Option<String>,
    pub stadium: Option<String>,
}

impl MatchRecord {
    /// A completed match; `result` is derived from the goals.
    pub fn played(
        match_id: usize,
        kickoff: NaiveDateTime,
        home_team: &str,
        away_team: &str,
        home_goals: u32,
        away_goals: u32,
    ) -> Self {
        Self {
            match_id,
            fallback_season: None,
            kickoff: Some(kickoff),
            kickoff_raw: None,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals: Some(home_goals),
            away_goals: Some(away_goals),
            result: Some(Outcome::from_goals(home_goals, away_goals)),
            round: None,
            stadium: None,
        }
    }

    /// A fixture without a final score.
    pub fn scheduled(
        match_id: usize,
        kickoff: Option<NaiveDateTime>,
        home_team: &str,
        away_team: &str,
    ) -> Self {
        Self {
            match_id,
            fallback_season: None,
            kickoff,
            kickoff_raw: None,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_goals: None,
            away_goals: None,
            result: None,
            round: None,
            stadium: None,
        }
    }

    /// Both goal counts present.
    pub fn is_completed(&self) -> bool {
        self.home_goals.is_some() && self.away_goals.is_some()
    }

    /// Kickoff text was present but did not parse.
    pub fn has_unparseable_kickoff(&self) -> bool {
        self.kickoff.is_none() && self.kickoff_raw.is_some()
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Guest => &self.away_team,
        }
    }

    /// `(scored, conceded)` for one side of a completed match.
    pub fn goals_for_side(&self, side: Side) -> Option<(u32, u32)> {
        let (Some(home), Some(away)) = (self.home_goals, self.away_goals) else {
            return None;
        };
        Some(match side {
            Side::Home => (home, away),
            Side::Guest => (away, home),
        })
    }

    pub fn kickoff_text(&self) -> Option<String> {
        match self.kickoff {
            Some(kickoff) => Some(kickoff.format(KICKOFF_FORMAT).to_string()),
            None => self.kickoff_raw.clone(),
        }
    }
}

pub fn parse_kickoff(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("null")
        || trimmed.eq_ignore_ascii_case("nat")
    {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Some(dt) = NaiveDate::parse_from_str(trimmed, fmt)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
        {
            return Some(dt);
        }
    }
    None
}

/// Splits a scoreboard string such as `"2 x 1"` into its two goal counts.
pub fn parse_score_pair(raw: &str) -> Option<(u32, u32)> {
    let mut nums = raw
        .split(|ch: char| !ch.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<u32>().ok());
    let home = nums.next()?;
    let away = nums.next()?;
    Some((home, away))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parse_score_pair_works() {
        assert_eq!(parse_score_pair("2 x 1"), Some((2, 1)));
        assert_eq!(parse_score_pair("0x0"), Some((0, 0)));
        assert_eq!(parse_score_pair("x"), None);
        assert_eq!(parse_score_pair(""), None);
    }

    #[test]
    fn parses_source_site_and_iso_dates() {
        let dt = parse_kickoff("13/04/2024 18:30").expect("site format");
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 4, 13));
        assert_eq!((dt.hour(), dt.minute()), (18, 30));

        let iso = parse_kickoff("2024-04-13T18:30:00").expect("iso");
        assert_eq!(iso, dt);
        let rfc = parse_kickoff("2024-04-13T21:30:00+03:00").expect("rfc3339");
        assert_eq!(rfc, dt);
        let date_only = parse_kickoff("2024-04-13").expect("date");
        assert_eq!(date_only.hour(), 0);

        assert!(parse_kickoff("  ").is_none());
        assert!(parse_kickoff("NaT").is_none());
        assert!(parse_kickoff("31/02/2024 10:00").is_none());
        assert!(parse_kickoff("soon").is_none());
    }

    #[test]
    fn outcome_relative_to_side() {
        assert_eq!(Outcome::from_goals(2, 1), Outcome::Home);
        assert_eq!(Outcome::from_goals(0, 3), Outcome::Away);
        assert_eq!(Outcome::from_goals(1, 1), Outcome::Draw);
        assert_eq!(Outcome::Home.for_side(Side::Guest), TeamResult::Loss);
        assert_eq!(Outcome::Away.for_side(Side::Guest), TeamResult::Win);
        assert_eq!(Outcome::Draw.for_side(Side::Home), TeamResult::Draw);
        assert_eq!(Outcome::parse_winning_team("Guest"), Some(Outcome::Away));
        assert_eq!(Outcome::parse_winning_team("tbd"), None);
    }
}
