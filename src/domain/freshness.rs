use std::collections::HashMap;

use chrono::{DateTime, Utc};
use lattices::map_union::MapUnionHashMap;
use lattices::{IsBot, LatticeFrom, Max, Merge};

/// Lattice-backed "last successful fetch" timestamp.
///
/// Merging keeps the later of the two instants, so a stamp never moves
/// backwards even if the wall clock does between two cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStamp {
    at: Max<DateTime<Utc>>,
}

impl FetchStamp {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at: Max::new(at) }
    }

    pub fn at(&self) -> DateTime<Utc> {
        *self.at.as_reveal_ref()
    }
}

impl Merge<FetchStamp> for FetchStamp {
    fn merge(&mut self, other: FetchStamp) -> bool {
        self.at.merge(other.at)
    }
}

impl LatticeFrom<FetchStamp> for FetchStamp {
    fn lattice_from(other: FetchStamp) -> Self {
        other
    }
}

impl IsBot for FetchStamp {
    fn is_bot(&self) -> bool {
        // A stamp always records a real fetch.
        false
    }
}

/// Per-repository last-success stamps for one category.
pub type RepoFetchTimes = MapUnionHashMap<String, FetchStamp>;

/// Stamps each named repository with `now`.
pub fn stamp_repos<'a>(
    times: &mut RepoFetchTimes,
    repos: impl IntoIterator<Item = &'a String>,
    now: DateTime<Utc>,
) -> bool {
    let delta: HashMap<String, FetchStamp> = repos
        .into_iter()
        .map(|name| (name.clone(), FetchStamp::new(now)))
        .collect();
    times.merge(RepoFetchTimes::new(delta))
}

/// Advances an optional global stamp to `now`.
pub fn stamp_global(slot: &mut Option<FetchStamp>, now: DateTime<Utc>) -> bool {
    match slot {
        Some(existing) => existing.merge(FetchStamp::new(now)),
        None => {
            *slot = Some(FetchStamp::new(now));
            true
        }
    }
}

/// Plain copy of the stamps, detached from the lattice.
pub fn reveal(times: &RepoFetchTimes) -> HashMap<String, DateTime<Utc>> {
    times
        .as_reveal_ref()
        .iter()
        .map(|(name, stamp)| (name.clone(), stamp.at()))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn stamp_adds_new_repos() {
        let mut times = RepoFetchTimes::default();
        let now = Utc::now();
        assert!(stamp_repos(&mut times, &names(&["a", "b"]), now));
        let plain = reveal(&times);
        assert_eq!(plain.len(), 2);
        assert_eq!(plain["a"], now);
    }

    #[test]
    fn later_stamp_wins() {
        let mut times = RepoFetchTimes::default();
        let t1 = Utc::now();
        let t2 = t1 + TimeDelta::seconds(5);
        stamp_repos(&mut times, &names(&["a"]), t1);
        assert!(stamp_repos(&mut times, &names(&["a"]), t2));
        assert_eq!(reveal(&times)["a"], t2);
    }

    #[test]
    fn earlier_stamp_is_ignored() {
        let mut times = RepoFetchTimes::default();
        let t2 = Utc::now();
        let t1 = t2 - TimeDelta::seconds(5);
        stamp_repos(&mut times, &names(&["a"]), t2);
        assert!(!stamp_repos(&mut times, &names(&["a"]), t1));
        assert_eq!(reveal(&times)["a"], t2);
    }

    #[test]
    fn untouched_repos_keep_their_stamp() {
        let mut times = RepoFetchTimes::default();
        let t1 = Utc::now();
        let t2 = t1 + TimeDelta::seconds(5);
        stamp_repos(&mut times, &names(&["a", "b"]), t1);
        stamp_repos(&mut times, &names(&["a"]), t2);
        let plain = reveal(&times);
        assert_eq!(plain["a"], t2);
        assert_eq!(plain["b"], t1);
    }

    #[test]
    fn global_stamp_starts_empty_then_advances() {
        let mut slot = None;
        let t1 = Utc::now();
        assert!(stamp_global(&mut slot, t1));
        assert_eq!(slot.map(|s| s.at()), Some(t1));
        let t2 = t1 + TimeDelta::milliseconds(1);
        assert!(stamp_global(&mut slot, t2));
        assert_eq!(slot.map(|s| s.at()), Some(t2));
    }
}
