use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ledger::{TeamLedger, TeamLedgerEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StandingsRow {
    pub team: String,
    pub rank: u32,
    pub points: u32,
    pub goal_difference: i64,
    pub goals_for: u32,
    pub goals_against: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

impl StandingsRow {
    pub fn played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }
}

/// A ranked snapshot of one season's ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StandingsTable {
    rows: Vec<StandingsRow>,
    by_team: HashMap<String, usize>,
}

impl StandingsTable {
    /// Ranks every team present in the ledger.
    ///
    /// Order: points, goal difference, goals scored (all descending), then
    /// team name ascending so equal records still get distinct ranks.
    pub fn from_ledger(ledger: &TeamLedger) -> Self {
        let mut teams: Vec<(&str, &TeamLedgerEntry)> = ledger.entries().collect();
        teams.sort_by(|a, b| standings_order(a, b));

        let rows: Vec<StandingsRow> = teams
            .into_iter()
            .enumerate()
            .map(|(idx, (team, entry))| StandingsRow {
                team: team.to_string(),
                rank: idx as u32 + 1,
                points: entry.points,
                goal_difference: entry.goal_difference(),
                goals_for: entry.goals_for,
                goals_against: entry.goals_against,
                wins: entry.wins,
                draws: entry.draws,
                losses: entry.losses,
            })
            .collect();
        let by_team = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (row.team.clone(), idx))
            .collect();
        Self { rows, by_team }
    }

    pub fn rows(&self) -> &[StandingsRow] {
        &self.rows
    }

    pub fn row(&self, team: &str) -> Option<&StandingsRow> {
        self.by_team.get(team).map(|&idx| &self.rows[idx])
    }

    /// `None` for a team without a committed match this season.
    pub fn position_of(&self, team: &str) -> Option<u32> {
        self.row(team).map(|row| row.rank)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn standings_order(a: &(&str, &TeamLedgerEntry), b: &(&str, &TeamLedgerEntry)) -> Ordering {
    let (team_a, ea) = a;
    let (team_b, eb) = b;
    eb.points
        .cmp(&ea.points)
        .then_with(|| eb.goal_difference().cmp(&ea.goal_difference()))
        .then_with(|| eb.goals_for.cmp(&ea.goals_for))
        .then_with(|| team_a.cmp(team_b))
}
