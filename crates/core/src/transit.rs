//! Rebuilds which stations a player boarded at, alighted at, and rode through.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{Station, StationEvent, StationEventKind, StationId};

/// Station lookup by id and by position along the line.
#[derive(Debug, Clone, Default)]
pub struct StationIndex {
    order_by_id: HashMap<StationId, i32>,
    id_by_order: BTreeMap<i32, StationId>,
}

impl StationIndex {
    #[must_use]
    pub fn new(stations: &[Station]) -> Self {
        let mut index = Self::default();
        for station in stations {
            index
                .order_by_id
                .insert(station.station_id.clone(), station.order_index);
            index
                .id_by_order
                .insert(station.order_index, station.station_id.clone());
        }
        index
    }

    #[must_use]
    pub fn order_of(&self, id: &StationId) -> Option<i32> {
        self.order_by_id.get(id).copied()
    }

    /// Stations strictly between `from` and `to`, listed in travel direction.
    ///
    /// Empty if either end is not a known station.
    #[must_use]
    pub fn between(&self, from: &StationId, to: &StationId) -> Vec<StationId> {
        let (Some(a), Some(b)) = (self.order_of(from), self.order_of(to)) else {
            return Vec::new();
        };
        if a == b {
            return Vec::new();
        }

        let (low, high) = (a.min(b), a.max(b));
        let inner = self
            .id_by_order
            .range(low.saturating_add(1)..high)
            .map(|(_, id)| id.clone());

        if a < b {
            inner.collect()
        } else {
            inner.rev().collect()
        }
    }
}

/// Station categories for a game, each without duplicates and in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StationVisits {
    pub boarded: Vec<StationId>,
    pub alighted: Vec<StationId>,
    pub passed: Vec<StationId>,
}

/// Categorise the station event log.
///
/// A `Board` with no matching `Alight` before the next `Board` is dropped. A
/// station that was boarded or alighted at is never also reported as passed.
#[must_use]
pub fn reconstruct(events: &[StationEvent], index: &StationIndex) -> StationVisits {
    let boarded = unique_of_kind(events, StationEventKind::Board);
    let alighted = unique_of_kind(events, StationEventKind::Alight);

    let mut passed_raw: Vec<StationId> = Vec::new();
    let mut current_board: Option<&StationId> = None;
    for event in events {
        match event.kind {
            StationEventKind::Board => current_board = Some(&event.station_id),
            StationEventKind::Alight => {
                if let Some(from) = current_board.take() {
                    passed_raw.extend(index.between(from, &event.station_id));
                }
            }
        }
    }

    let stopped: HashSet<&StationId> = boarded.iter().chain(alighted.iter()).collect();
    let passed = unique(passed_raw.into_iter().filter(|id| !stopped.contains(id)));

    StationVisits {
        boarded,
        alighted,
        passed,
    }
}

fn unique_of_kind(events: &[StationEvent], kind: StationEventKind) -> Vec<StationId> {
    unique(
        events
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.station_id.clone()),
    )
}

fn unique(ids: impl IntoIterator<Item = StationId>) -> Vec<StationId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sid(id: &str) -> StationId {
        StationId::new(id)
    }

    fn line() -> StationIndex {
        let stations: Vec<Station> = ["A", "B", "C", "D", "E"]
            .iter()
            .zip(1..)
            .map(|(id, order)| Station::new(sid(id), format!("Station {id}"), order))
            .collect();
        StationIndex::new(&stations)
    }

    fn ids(raw: &[&str]) -> Vec<StationId> {
        raw.iter().map(|id| sid(id)).collect()
    }

    #[test]
    fn forward_leg_lists_inner_stations() {
        let events = vec![StationEvent::board(sid("A")), StationEvent::alight(sid("D"))];
        let visits = reconstruct(&events, &line());

        assert_eq!(visits.boarded, ids(&["A"]));
        assert_eq!(visits.alighted, ids(&["D"]));
        assert_eq!(visits.passed, ids(&["B", "C"]));
    }

    #[test]
    fn reverse_leg_keeps_travel_order() {
        let events = vec![StationEvent::board(sid("D")), StationEvent::alight(sid("A"))];
        let visits = reconstruct(&events, &line());
        assert_eq!(visits.passed, ids(&["C", "B"]));
    }

    #[test]
    fn stopped_station_is_not_reported_as_passed() {
        // A -> C passes B; later B -> E: B is boarded so only C, D count as passed.
        let events = vec![
            StationEvent::board(sid("A")),
            StationEvent::alight(sid("C")),
            StationEvent::board(sid("B")),
            StationEvent::alight(sid("E")),
        ];
        let visits = reconstruct(&events, &line());

        assert_eq!(visits.boarded, ids(&["A", "B"]));
        assert_eq!(visits.alighted, ids(&["C", "E"]));
        assert_eq!(visits.passed, ids(&["D"]));
    }

    #[test]
    fn trailing_board_contributes_nothing() {
        let events = vec![
            StationEvent::board(sid("A")),
            StationEvent::alight(sid("B")),
            StationEvent::board(sid("B")),
        ];
        let visits = reconstruct(&events, &line());
        assert!(visits.passed.is_empty());
        assert_eq!(visits.boarded, ids(&["A", "B"]));
    }

    #[test]
    fn reboarding_discards_the_open_leg() {
        let events = vec![
            StationEvent::board(sid("A")),
            StationEvent::board(sid("C")),
            StationEvent::alight(sid("E")),
        ];
        let visits = reconstruct(&events, &line());
        assert_eq!(visits.passed, ids(&["D"]));
    }

    #[test]
    fn unknown_endpoint_skips_the_leg() {
        let events = vec![
            StationEvent::board(sid("A")),
            StationEvent::alight(sid("ZZ")),
            StationEvent::board(sid("E")),
            StationEvent::alight(sid("C")),
        ];
        let visits = reconstruct(&events, &line());
        assert_eq!(visits.passed, ids(&["D"]));
        assert_eq!(visits.alighted, ids(&["ZZ", "C"]));
    }

    #[test]
    fn gaps_in_order_index_are_skipped() {
        let stations = vec![
            Station::new(sid("A"), "A", 10),
            Station::new(sid("B"), "B", 20),
            Station::new(sid("C"), "C", 40),
        ];
        let index = StationIndex::new(&stations);
        assert_eq!(index.between(&sid("A"), &sid("C")), ids(&["B"]));
    }

    #[test]
    fn empty_and_one_sided_logs() {
        assert_eq!(reconstruct(&[], &line()), StationVisits::default());

        let only_alights = vec![StationEvent::alight(sid("B")), StationEvent::alight(sid("D"))];
        let visits = reconstruct(&only_alights, &line());
        assert!(visits.boarded.is_empty());
        assert!(visits.passed.is_empty());
        assert_eq!(visits.alighted, ids(&["B", "D"]));
    }
}
