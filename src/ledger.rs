use std::collections::HashMap;

use crate::match_record::{MatchRecord, Side};

/// Cumulative season state of one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeamLedgerEntry {
    pub points: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl TeamLedgerEntry {
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    /// Completed matches committed so far.
    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn wins_pct(&self) -> f64 {
        share(self.wins, self.played())
    }

    pub fn draws_pct(&self) -> f64 {
        share(self.draws, self.played())
    }

    pub fn losses_pct(&self) -> f64 {
        share(self.losses, self.played())
    }

    fn apply(&mut self, scored: u32, conceded: u32) {
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.wins += 1;
                self.points += 3;
            }
            std::cmp::Ordering::Equal => {
                self.draws += 1;
                self.points += 1;
            }
            std::cmp::Ordering::Less => {
                self.losses += 1;
            }
        }
    }
}

// Zero denominators resolve to 0.0 rather than NaN.
fn share(count: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        f64::from(count) / f64::from(total)
    }
}

/// Per-team accumulator for a single season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamLedger {
    season: i32,
    entries: HashMap<String, TeamLedgerEntry>,
    commits: usize,
}

impl TeamLedger {
    pub fn new(season: i32) -> Self {
        Self {
            season,
            entries: HashMap::new(),
            commits: 0,
        }
    }

    pub fn season(&self) -> i32 {
        self.season
    }

    pub fn get(&self, team: &str) -> Option<&TeamLedgerEntry> {
        self.entries.get(team)
    }

    /// Pre-match state of `team`; zeroes for a team that has not played yet.
    pub fn snapshot(&self, team: &str) -> TeamLedgerEntry {
        self.entries.get(team).copied().unwrap_or_default()
    }

    pub fn get_or_create(&mut self, team: &str) -> &mut TeamLedgerEntry {
        self.entries.entry(team.to_string()).or_default()
    }

    /// Applies a completed match to both sides. Returns `false` without
    /// touching any entry when either goal count is missing. Points and W/D/L
    /// come from the goals alone; `record.result` is not consulted.
    ///
    /// Must run exactly once per match, after that match's features are read.
    pub fn commit(&mut self, record: &MatchRecord) -> bool {
        if !record.is_completed() {
            return false;
        }
        for side in [Side::Home, Side::Guest] {
            let Some((scored, conceded)) = record.goals_for_side(side) else {
                continue;
            };
            self.get_or_create(record.team(side)).apply(scored, conceded);
        }
        self.commits += 1;
        true
    }

    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &TeamLedgerEntry)> {
        self.entries.iter().map(|(team, entry)| (team.as_str(), entry))
    }
}
