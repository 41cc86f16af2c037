//! Rolling "last N matches" form.
//!
//! Windows are taken over each team's completed, dated matches regardless of
//! season. The history is built once per run and only read afterwards, so
//! season replays may share it across threads.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::match_record::{MatchRecord, Outcome, Side, TeamResult};

pub const DEFAULT_FORM_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormStats {
    pub matches: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_scored: u32,
    pub goals_conceded: u32,
}

impl FormStats {
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_scored) - i64::from(self.goals_conceded)
    }

    fn add(&mut self, entry: &FormEntry) {
        self.matches += 1;
        self.goals_scored += entry.scored;
        self.goals_conceded += entry.conceded;
        match entry.result {
            TeamResult::Win => self.wins += 1,
            TeamResult::Draw => self.draws += 1,
            TeamResult::Loss => self.losses += 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct FormEntry {
    kickoff: NaiveDateTime,
    scored: u32,
    conceded: u32,
    result: TeamResult,
}

#[derive(Debug, Clone)]
pub struct RollingForm {
    window: usize,
    history: HashMap<String, Vec<FormEntry>>,
}

impl RollingForm {
    pub fn build(records: &[MatchRecord], window: usize) -> Self {
        let mut history: HashMap<String, Vec<FormEntry>> = HashMap::new();
        for record in records {
            let Some(kickoff) = record.kickoff else {
                continue;
            };
            let (Some(home), Some(away)) = (record.home_goals, record.away_goals) else {
                continue;
            };
            let outcome = Outcome::from_goals(home, away);
            for side in [Side::Home, Side::Guest] {
                let Some((scored, conceded)) = record.goals_for_side(side) else {
                    continue;
                };
                history
                    .entry(record.team(side).to_string())
                    .or_default()
                    .push(FormEntry {
                        kickoff,
                        scored,
                        conceded,
                        result: outcome.for_side(side),
                    });
            }
        }
        for entries in history.values_mut() {
            entries.sort_by_key(|e| e.kickoff);
        }
        Self { window, history }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Form over the last `window` completed matches of `team` kicking off
    /// strictly before `cutoff`.
    pub fn form_before(&self, team: &str, cutoff: NaiveDateTime) -> FormStats {
        self.window_stats(team, |entries| {
            entries.partition_point(|e| e.kickoff < cutoff)
        })
    }

    /// Same window, but including matches kicking off at `last`.
    pub fn form_through(&self, team: &str, last: NaiveDateTime) -> FormStats {
        self.window_stats(team, |entries| {
            entries.partition_point(|e| e.kickoff <= last)
        })
    }

    fn window_stats(&self, team: &str, end_of: impl Fn(&[FormEntry]) -> usize) -> FormStats {
        let mut stats = FormStats::default();
        let Some(entries) = self.history.get(team) else {
            return stats;
        };
        let end = end_of(entries);
        let start = end.saturating_sub(self.window);
        for entry in &entries[start..end] {
            stats.add(entry);
        }
        stats
    }

    /// Number of completed, dated matches known for `team`.
    pub fn history_len(&self, team: &str) -> usize {
        self.history.get(team).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    #[test]
    fn last_five_of_six() {
        // Oldest to newest for A: W W D L W W.
        let records = vec![
            MatchRecord::played(0, day(2024, 3, 1), "A", "B", 2, 0),
            MatchRecord::played(1, day(2024, 3, 8), "C", "A", 0, 1),
            MatchRecord::played(2, day(2024, 3, 15), "A", "D", 1, 1),
            MatchRecord::played(3, day(2024, 3, 22), "E", "A", 3, 0),
            MatchRecord::played(4, day(2024, 3, 29), "A", "B", 4, 2),
            MatchRecord::played(5, day(2024, 4, 5), "C", "A", 1, 2),
        ];
        let form = RollingForm::build(&records, 5);
        let stats = form.form_before("A", day(2024, 4, 12));
        assert_eq!((stats.wins, stats.draws, stats.losses), (3, 1, 1));
        assert_eq!(stats.matches, 5);
        assert_eq!((stats.goals_scored, stats.goals_conceded), (8, 7));
        assert_eq!(stats.goal_difference(), 1);
    }

    #[test]
    fn cutoff_is_strict() {
        let records = vec![
            MatchRecord::played(0, day(2024, 3, 1), "A", "B", 2, 0),
            MatchRecord::played(1, day(2024, 3, 8), "A", "B", 0, 1),
        ];
        let form = RollingForm::build(&records, 5);
        let stats = form.form_before("A", day(2024, 3, 8));
        assert_eq!((stats.matches, stats.wins, stats.losses), (1, 1, 0));
        assert_eq!(form.form_before("A", day(2024, 3, 1)), FormStats::default());
        assert_eq!(form.form_through("A", day(2024, 3, 8)).matches, 2);
    }

    #[test]
    fn spans_seasons_and_skips_incomplete() {
        let records = vec![
            MatchRecord::played(0, day(2024, 12, 1), "A", "B", 0, 0),
            MatchRecord::scheduled(1, Some(day(2025, 1, 10)), "A", "C"),
            MatchRecord::played(2, day(2025, 1, 20), "B", "A", 1, 0),
        ];
        let form = RollingForm::build(&records, 5);
        let stats = form.form_before("A", day(2025, 2, 1));
        assert_eq!((stats.matches, stats.draws, stats.losses), (2, 1, 1));
        assert_eq!(form.history_len("C"), 0);
        assert_eq!(form.form_before("Nobody", day(2025, 2, 1)), FormStats::default());
    }
}
