//! As-of feature assembly.
//!
//! Each season is replayed in kickoff order against its own ledger. Features
//! are read before any result of the same kickoff instant is committed, so a
//! row only sees matches that kicked off strictly earlier.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::calendar::CalendarFeatures;
use crate::config::EngineConfig;
use crate::form::{FormStats, RollingForm};
use crate::indexer::{ChronologicalIndex, SeasonSlice, index_matches};
use crate::ledger::{TeamLedger, TeamLedgerEntry};
use crate::match_record::{MatchRecord, Side};
use crate::season::SeasonKey;
use crate::standings::StandingsTable;
use crate::table::MatchTable;

/// Pre-match state of one side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideFeatures {
    pub form: FormStats,
    /// `None` until the team has a committed match this season.
    pub position: Option<u32>,
    pub season: TeamLedgerEntry,
}

/// Home minus guest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureDiff {
    pub position: Option<i64>,
    pub goal_difference_last_n: i64,
    pub goals_scored: i64,
    pub goals_conceded: i64,
    pub goal_difference: i64,
    pub points: i64,
    pub wins: i64,
    pub draws: i64,
    pub losses: i64,
    pub wins_pct: f64,
    pub draws_pct: f64,
    pub losses_pct: f64,
}

impl FeatureDiff {
    pub fn between(home: &SideFeatures, guest: &SideFeatures) -> Self {
        let (h, g) = (&home.season, &guest.season);
        Self {
            position: match (home.position, guest.position) {
                (Some(hp), Some(gp)) => Some(i64::from(hp) - i64::from(gp)),
                _ => None,
            },
            goal_difference_last_n: home.form.goal_difference() - guest.form.goal_difference(),
            goals_scored: i64::from(h.goals_for) - i64::from(g.goals_for),
            goals_conceded: i64::from(h.goals_against) - i64::from(g.goals_against),
            goal_difference: h.goal_difference() - g.goal_difference(),
            points: i64::from(h.points) - i64::from(g.points),
            wins: i64::from(h.wins) - i64::from(g.wins),
            draws: i64::from(h.draws) - i64::from(g.draws),
            losses: i64::from(h.losses) - i64::from(g.losses),
            wins_pct: h.wins_pct() - g.wins_pct(),
            draws_pct: h.draws_pct() - g.draws_pct(),
            losses_pct: h.losses_pct() - g.losses_pct(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub match_id: usize,
    /// Index of the match in the record slice the run was built from.
    pub record_pos: usize,
    pub season: i32,
    pub home: SideFeatures,
    pub guest: SideFeatures,
    pub diff: FeatureDiff,
    pub calendar: Option<CalendarFeatures>,
    /// Whether this match was applied to the ledger after being featured.
    pub committed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonReplay {
    pub rows: Vec<FeatureRow>,
    pub ledger: TeamLedger,
    pub incomplete: usize,
}

#[derive(Debug, Clone)]
pub struct SeasonSummary {
    pub season: i32,
    pub matches: usize,
    pub commits: usize,
    pub incomplete: usize,
    pub final_standings: StandingsTable,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub rows_read: usize,
    pub rows_featured: usize,
    /// `match_id`s dropped because no season could be derived.
    pub excluded: Vec<usize>,
    pub missing_kickoff: usize,
    pub unparseable_kickoff: usize,
    pub incomplete_matches: usize,
    pub commits: usize,
    pub winner_mismatches: usize,
    pub invalid_scores: usize,
    /// Input rows dropped at load time for lacking a team name.
    pub skipped_rows: usize,
}

impl RunReport {
    pub fn log(&self) {
        info!(
            rows_read = self.rows_read,
            rows_featured = self.rows_featured,
            commits = self.commits,
            incomplete = self.incomplete_matches,
            "feature run complete"
        );
        if !self.excluded.is_empty() {
            warn!(
                count = self.excluded.len(),
                ids = ?self.excluded,
                "rows excluded: no kickoff and no season column"
            );
        }
        if self.unparseable_kickoff > 0 {
            warn!(count = self.unparseable_kickoff, "rows with unparseable kickoff");
        }
        if self.missing_kickoff > 0 {
            info!(count = self.missing_kickoff, "rows without kickoff");
        }
        if self.winner_mismatches > 0 {
            warn!(
                count = self.winner_mismatches,
                "winning_team disagreed with score; derived value used"
            );
        }
        if self.invalid_scores > 0 {
            warn!(count = self.invalid_scores, "negative scores treated as missing");
        }
        if self.skipped_rows > 0 {
            warn!(count = self.skipped_rows, "rows without team names skipped");
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeatureRun {
    /// One row per featured match, in input order.
    pub rows: Vec<FeatureRow>,
    pub seasons: Vec<SeasonSummary>,
    pub report: RunReport,
    pub form_window: usize,
}

impl FeatureRun {
    pub fn row_for(&self, match_id: usize) -> Option<&FeatureRow> {
        self.rows.iter().find(|row| row.match_id == match_id)
    }

    pub fn season(&self, season: i32) -> Option<&SeasonSummary> {
        self.seasons.iter().find(|s| s.season == season)
    }
}

/// Runs the full pass over a loaded table, carrying its load anomalies into
/// the report.
pub fn assemble_table(table: &MatchTable, cfg: &EngineConfig) -> FeatureRun {
    let mut run = assemble(&table.records, cfg);
    run.report.winner_mismatches = table.winner_mismatches;
    run.report.invalid_scores = table.invalid_scores;
    run.report.skipped_rows = table.skipped_rows;
    run
}

pub fn assemble(records: &[MatchRecord], cfg: &EngineConfig) -> FeatureRun {
    assemble_with_key(records, &cfg.season_key(), cfg)
}

pub fn assemble_with_key(
    records: &[MatchRecord],
    season_key: &dyn SeasonKey,
    cfg: &EngineConfig,
) -> FeatureRun {
    let index = index_matches(records, season_key);
    let form = RollingForm::build(records, cfg.form_window);
    debug!(
        seasons = index.seasons.len(),
        window = cfg.form_window,
        "replaying seasons"
    );

    let replays = replay_all(records, &index, &form, cfg);

    let mut report = RunReport {
        rows_read: records.len(),
        excluded: index.excluded.clone(),
        missing_kickoff: index.missing_kickoff,
        unparseable_kickoff: index.unparseable_kickoff,
        ..RunReport::default()
    };
    let mut rows = Vec::with_capacity(index.indexed_len());
    let mut seasons = Vec::with_capacity(replays.len());
    for replay in replays {
        report.incomplete_matches += replay.incomplete;
        report.commits += replay.ledger.commits();
        seasons.push(SeasonSummary {
            season: replay.ledger.season(),
            matches: replay.rows.len(),
            commits: replay.ledger.commits(),
            incomplete: replay.incomplete,
            final_standings: StandingsTable::from_ledger(&replay.ledger),
        });
        rows.extend(replay.rows);
    }
    rows.sort_unstable_by_key(|row| row.record_pos);
    report.rows_featured = rows.len();

    FeatureRun {
        rows,
        seasons,
        report,
        form_window: form.window(),
    }
}

fn replay_all(
    records: &[MatchRecord],
    index: &ChronologicalIndex,
    form: &RollingForm,
    cfg: &EngineConfig,
) -> Vec<SeasonReplay> {
    if !cfg.parallel_seasons || index.seasons.len() < 2 {
        return index
            .seasons
            .iter()
            .map(|slice| replay_season(records, slice, form))
            .collect();
    }
    with_replay_pool(cfg.threads, || {
        index
            .seasons
            .par_iter()
            .map(|slice| replay_season(records, slice, form))
            .collect()
    })
}

fn with_replay_pool<T>(threads: Option<usize>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    let Some(threads) = threads else {
        return action();
    };
    match rayon::ThreadPoolBuilder::new().num_threads(threads).build() {
        Ok(pool) => pool.install(action),
        Err(_) => action(),
    }
}

/// Replays one season. Matches sharing a kickoff instant form one round: all
/// of them are featured against the same state, then committed together.
pub fn replay_season(
    records: &[MatchRecord],
    slice: &SeasonSlice,
    form: &RollingForm,
) -> SeasonReplay {
    let mut ledger = TeamLedger::new(slice.season);
    let mut standings = StandingsTable::default();
    let mut standings_commits = 0usize;
    let mut rows = Vec::with_capacity(slice.order.len());
    let mut incomplete = 0usize;
    let (dated, undated) = slice.order.split_at(slice.dated);
    let season_end = dated.last().and_then(|&pos| records[pos].kickoff);

    let rounds = dated
        .chunk_by(|&a, &b| records[a].kickoff == records[b].kickoff)
        .chain(std::iter::once(undated));
    for round in rounds {
        if ledger.commits() != standings_commits {
            standings = StandingsTable::from_ledger(&ledger);
            standings_commits = ledger.commits();
        }

        let first_row = rows.len();
        for &pos in round {
            let record = &records[pos];
            let home = side_features(record, Side::Home, form, season_end, &ledger, &standings);
            let guest = side_features(record, Side::Guest, form, season_end, &ledger, &standings);
            if !record.is_completed() {
                incomplete += 1;
            }
            rows.push(FeatureRow {
                match_id: record.match_id,
                record_pos: pos,
                season: slice.season,
                diff: FeatureDiff::between(&home, &guest),
                home,
                guest,
                calendar: record.kickoff.map(CalendarFeatures::from_kickoff),
                committed: false,
            });
        }

        for (row, &pos) in rows[first_row..].iter_mut().zip(round) {
            let record = &records[pos];
            // Undated matches are terminal reads: they never reach the ledger.
            row.committed = record.kickoff.is_some() && ledger.commit(record);
        }
    }

    SeasonReplay {
        rows,
        ledger,
        incomplete,
    }
}

fn side_features(
    record: &MatchRecord,
    side: Side,
    form: &RollingForm,
    season_end: Option<NaiveDateTime>,
    ledger: &TeamLedger,
    standings: &StandingsTable,
) -> SideFeatures {
    let team = record.team(side);
    // An undated match reads the state as of its season's last kickoff.
    let form = match (record.kickoff, season_end) {
        (Some(kickoff), _) => form.form_before(team, kickoff),
        (None, Some(end)) => form.form_through(team, end),
        (None, None) => FormStats::default(),
    };
    SideFeatures {
        form,
        position: standings.position_of(team),
        season: ledger.snapshot(team),
    }
}

/// Standings of `season` built from completed matches kicking off strictly
/// before `cutoff` (or all of them when `cutoff` is `None`).
pub fn standings_before(
    records: &[MatchRecord],
    season_key: &dyn SeasonKey,
    season: i32,
    cutoff: Option<NaiveDateTime>,
) -> StandingsTable {
    let index = index_matches(records, season_key);
    let mut ledger = TeamLedger::new(season);
    if let Some(slice) = index.season(season) {
        for &pos in &slice.order[..slice.dated] {
            let record = &records[pos];
            let Some(kickoff) = record.kickoff else {
                continue;
            };
            if cutoff.is_some_and(|c| kickoff >= c) {
                break;
            }
            ledger.commit(record);
        }
    }
    StandingsTable::from_ledger(&ledger)
}
