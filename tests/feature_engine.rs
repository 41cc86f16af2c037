use chrono::{NaiveDate, NaiveDateTime};

use matchday_features::config::EngineConfig;
use matchday_features::features::{assemble, assemble_with_key, replay_season};
use matchday_features::form::RollingForm;
use matchday_features::indexer::index_matches;
use matchday_features::ledger::TeamLedgerEntry;
use matchday_features::match_record::MatchRecord;
use matchday_features::output::build_output_table;
use matchday_features::season::{CalendarYear, SplitYear};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(16, 0, 0)
        .unwrap()
}

/// Six rounds of a four-team league across two calendar years.
fn league() -> Vec<MatchRecord> {
    let fixtures = [
        (2023, 8, 5, "A", "B", 2, 0),
        (2023, 8, 5, "C", "D", 1, 1),
        (2023, 8, 12, "B", "C", 0, 3),
        (2023, 8, 12, "D", "A", 2, 2),
        (2023, 8, 19, "A", "C", 1, 0),
        (2023, 8, 19, "B", "D", 1, 2),
        (2024, 3, 2, "B", "A", 1, 1),
        (2024, 3, 2, "D", "C", 0, 2),
        (2024, 3, 9, "C", "B", 2, 2),
        (2024, 3, 9, "A", "D", 4, 1),
        (2024, 3, 16, "C", "A", 0, 1),
        (2024, 3, 16, "D", "B", 3, 0),
    ];
    fixtures
        .iter()
        .enumerate()
        .map(|(id, &(y, m, d, home, away, hg, ag))| {
            MatchRecord::played(id, at(y, m, d), home, away, hg, ag)
        })
        .collect()
}

#[test]
fn features_ignore_later_results() {
    let records = league();
    let cfg = EngineConfig::default();
    let baseline = assemble(&records, &cfg);

    for cut in 0..records.len() {
        let cutoff = records[cut].kickoff.unwrap();
        let mut altered = records.clone();
        // Everything from the same kickoff instant on, except the match itself.
        for record in altered
            .iter_mut()
            .filter(|r| r.match_id != cut && r.kickoff.unwrap() >= cutoff)
        {
            *record = MatchRecord::played(
                record.match_id,
                record.kickoff.unwrap(),
                &record.home_team,
                &record.away_team,
                7,
                0,
            );
        }
        let run = assemble(&altered, &cfg);
        assert_eq!(
            run.row_for(cut),
            baseline.row_for(cut),
            "features of match {cut} changed when simultaneous or later results changed"
        );
    }
}

#[test]
fn season_boundary_resets_ledger_but_not_form() {
    let records = league();
    let run = assemble(&records, &EngineConfig::default());

    let opener = run.row_for(6).unwrap();
    assert_eq!(opener.season, 2024);
    assert_eq!(opener.home.season, TeamLedgerEntry::default());
    assert_eq!(opener.guest.season, TeamLedgerEntry::default());
    assert_eq!(opener.home.position, None);
    assert_eq!(opener.diff.position, None);
    // Form carries over from 2023: A went W, D, W.
    assert_eq!(opener.guest.form.matches, 3);
    assert_eq!(opener.guest.form.wins, 2);
    assert_eq!(opener.guest.form.draws, 1);

    let last_2023 = run.row_for(5).unwrap();
    assert_eq!(last_2023.season, 2023);
    assert_eq!(last_2023.home.season.played(), 2);

    let standings_2023 = &run.season(2023).unwrap().final_standings;
    assert_eq!(standings_2023.position_of("A"), Some(1));
    assert_eq!(standings_2023.row("A").unwrap().points, 7);
}

#[test]
fn incomplete_match_is_featured_but_never_committed() {
    let mut records = vec![
        MatchRecord::played(0, at(2024, 4, 1), "A", "B", 1, 0),
        MatchRecord::scheduled(1, Some(at(2024, 4, 8)), "A", "C"),
        MatchRecord::played(2, at(2024, 4, 15), "C", "A", 0, 0),
    ];
    records[1].home_goals = Some(3);
    let run = assemble(&records, &EngineConfig::default());

    let pending = run.row_for(1).unwrap();
    assert!(!pending.committed);
    assert_eq!(pending.home.season.points, 3);
    assert_eq!(pending.home.position, Some(1));
    assert_eq!(pending.guest.position, None);

    let next = run.row_for(2).unwrap();
    assert_eq!(next.guest.season.played(), 1);
    assert_eq!(next.guest.form.matches, 1);
    assert_eq!(next.home.season, TeamLedgerEntry::default());
    assert_eq!(run.report.incomplete_matches, 1);
    assert_eq!(run.report.commits, 2);
}

#[test]
fn equal_records_rank_by_team_name() {
    let records = vec![
        MatchRecord::played(0, at(2024, 4, 1), "Zebras", "Lions", 2, 1),
        MatchRecord::played(1, at(2024, 4, 1), "Ants", "Moles", 2, 1),
        MatchRecord::played(2, at(2024, 4, 8), "Ants", "Zebras", 0, 0),
    ];
    let run = assemble(&records, &EngineConfig::default());
    let row = run.row_for(2).unwrap();
    assert_eq!(row.home.position, Some(1));
    assert_eq!(row.guest.position, Some(2));
    assert_eq!(row.diff.position, Some(-1));

    let table = &run.season(2024).unwrap().final_standings;
    let order: Vec<&str> = table.rows().iter().map(|r| r.team.as_str()).collect();
    assert_eq!(order, vec!["Ants", "Zebras", "Lions", "Moles"]);
    let ranks: Vec<u32> = table.rows().iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4]);
}

#[test]
fn replaying_a_season_twice_is_identical() {
    let records = league();
    let index = index_matches(&records, &CalendarYear);
    let form = RollingForm::build(&records, 5);
    for slice in &index.seasons {
        let first = replay_season(&records, slice, &form);
        let second = replay_season(&records, slice, &form);
        assert_eq!(first, second);
    }
}

#[test]
fn parallel_and_serial_runs_match() {
    let records = league();
    let serial_cfg = EngineConfig {
        parallel_seasons: false,
        ..EngineConfig::default()
    };
    let parallel_cfg = EngineConfig {
        parallel_seasons: true,
        threads: Some(2),
        ..EngineConfig::default()
    };
    let serial = assemble(&records, &serial_cfg);
    let parallel = assemble(&records, &parallel_cfg);
    assert_eq!(serial.rows, parallel.rows);
    assert_eq!(
        build_output_table(&records, &serial),
        build_output_table(&records, &parallel)
    );
}

#[test]
fn output_keeps_input_order() {
    let mut records = league();
    records.reverse();
    for (pos, record) in records.iter_mut().enumerate() {
        record.match_id = pos;
    }
    let run = assemble(&records, &EngineConfig::default());
    let ids: Vec<usize> = run.rows.iter().map(|r| r.match_id).collect();
    assert_eq!(ids, (0..records.len()).collect::<Vec<_>>());
}

#[test]
fn form_window_over_six_results() {
    // A: W W D L W W, then a seventh fixture to read features from.
    let records = vec![
        MatchRecord::played(0, at(2024, 3, 1), "A", "B", 2, 0),
        MatchRecord::played(1, at(2024, 3, 8), "C", "A", 0, 1),
        MatchRecord::played(2, at(2024, 3, 15), "A", "D", 1, 1),
        MatchRecord::played(3, at(2024, 3, 22), "E", "A", 3, 0),
        MatchRecord::played(4, at(2024, 3, 29), "A", "B", 4, 2),
        MatchRecord::played(5, at(2024, 4, 5), "C", "A", 1, 2),
        MatchRecord::scheduled(6, Some(at(2024, 4, 12)), "A", "E"),
    ];
    let run = assemble(&records, &EngineConfig::default());
    let table = build_output_table(&records, &run);
    let last = |name: &str| match table.column(name) {
        Some(matchday_features::output::ColumnValues::Int(v)) => v[6],
        other => panic!("unexpected column {name}: {other:?}"),
    };
    assert_eq!(last("home_team_wins_last_5"), Some(3));
    assert_eq!(last("home_team_draws_last_5"), Some(1));
    assert_eq!(last("home_team_loses_last_5"), Some(1));
    assert_eq!(last("home_team_goals_scored_last_5"), Some(8));
    assert_eq!(last("home_team_goals_conceded_last_5"), Some(7));
    assert_eq!(last("home_team_wins_so_far"), Some(4));
    assert_eq!(last("home_team_points"), Some(13));
}

#[test]
fn split_year_and_closure_keys_group_seasons() {
    let records = vec![
        MatchRecord::played(0, at(2023, 9, 1), "A", "B", 1, 0),
        MatchRecord::played(1, at(2024, 2, 1), "B", "A", 1, 0),
        MatchRecord::played(2, at(2024, 9, 1), "A", "B", 1, 0),
    ];
    let cfg = EngineConfig::default();
    let split = assemble_with_key(&records, &SplitYear::new(8), &cfg);
    let seasons: Vec<i32> = split.rows.iter().map(|r| r.season).collect();
    assert_eq!(seasons, vec![2023, 2023, 2024]);
    assert_eq!(split.row_for(1).unwrap().guest.season.points, 3);

    let decade = |k: NaiveDateTime| chrono::Datelike::year(&k) / 10;
    let coarse = assemble_with_key(&records, &decade, &cfg);
    assert_eq!(coarse.seasons.len(), 1);
    assert_eq!(coarse.row_for(2).unwrap().home.season.played(), 2);
}
