use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::match_record::MatchRecord;
use crate::season::SeasonKey;

/// Replay order for one season: positions into the record slice, dated
/// matches first by kickoff, then undated matches in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonSlice {
    pub season: i32,
    pub order: Vec<usize>,
    /// Number of leading entries in `order` that carry a kickoff.
    pub dated: usize,
}

impl SeasonSlice {
    pub fn undated(&self) -> &[usize] {
        &self.order[self.dated..]
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChronologicalIndex {
    pub seasons: Vec<SeasonSlice>,
    /// `match_id`s of rows with neither a kickoff nor a fallback season.
    pub excluded: Vec<usize>,
    pub missing_kickoff: usize,
    pub unparseable_kickoff: usize,
}

impl ChronologicalIndex {
    pub fn season(&self, season: i32) -> Option<&SeasonSlice> {
        self.seasons.iter().find(|s| s.season == season)
    }

    pub fn indexed_len(&self) -> usize {
        self.seasons.iter().map(|s| s.order.len()).sum()
    }
}

/// Sorts and partitions the table; caller-supplied row order is never
/// trusted beyond breaking kickoff ties.
pub fn index_matches(records: &[MatchRecord], season_key: &dyn SeasonKey) -> ChronologicalIndex {
    let mut by_season: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    let mut index = ChronologicalIndex::default();

    for (pos, record) in records.iter().enumerate() {
        if record.kickoff.is_none() {
            if let Some(raw) = record.kickoff_raw.as_deref() {
                warn!(
                    match_id = record.match_id,
                    raw, "unparseable kickoff; match will not feed ledger or form"
                );
                index.unparseable_kickoff += 1;
            } else {
                debug!(match_id = record.match_id, "missing kickoff");
                index.missing_kickoff += 1;
            }
        }

        let season = record
            .kickoff
            .map(|k| season_key.season_of(k))
            .or(record.fallback_season);
        let Some(season) = season else {
            warn!(
                match_id = record.match_id,
                home = %record.home_team,
                guest = %record.away_team,
                "no season derivable; row excluded"
            );
            index.excluded.push(record.match_id);
            continue;
        };
        by_season.entry(season).or_default().push(pos);
    }

    for (season, mut order) in by_season {
        // Stable: equal kickoffs and undated rows keep input order.
        order.sort_by_key(|&pos| {
            let kickoff = records[pos].kickoff;
            (kickoff.is_none(), kickoff)
        });
        let dated = order
            .iter()
            .take_while(|&&pos| records[pos].kickoff.is_some())
            .count();
        index.seasons.push(SeasonSlice {
            season,
            order,
            dated,
        });
    }

    index
}
