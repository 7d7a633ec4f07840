// src/model/priority.rs

use std::cmp::Ordering;
use std::collections::HashMap;

use tracing::warn;

use crate::model::types::{ClientId, DEFAULT_RANK};

/// One row of the priority table after coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientPriority {
    pub client: ClientId,
    /// The cell exactly as it was read, echoed back on export.
    pub raw_rank: String,
    pub rank: f64,
    /// False when `rank` is the default because the cell was not a number.
    pub explicit: bool,
}

/// Maps each client to its rank. Lower ranks are served first.
#[derive(Debug, Clone)]
pub struct PriorityTable {
    entries: Vec<ClientPriority>,
    index: HashMap<ClientId, usize>,
    default_rank: f64,
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(DEFAULT_RANK)
    }
}

impl PriorityTable {
    pub fn new(default_rank: f64) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            default_rank,
        }
    }

    /// Builds the table from `(client, raw rank)` pairs in input order.
    pub fn from_raw<I, C, R>(rows: I, default_rank: f64) -> Self
    where
        I: IntoIterator<Item = (C, R)>,
        C: Into<ClientId>,
        R: Into<String>,
    {
        let mut table = Self::new(default_rank);
        for (client, raw) in rows {
            table.insert(client.into(), raw.into());
        }
        table
    }

    /// Adds a client. A repeated client keeps its first row.
    pub fn insert(&mut self, client: ClientId, raw_rank: String) {
        if self.index.contains_key(&client) {
            warn!("client '{}' listed twice in priority table, keeping first rank", client);
            return;
        }

        let (rank, explicit) = match coerce_rank(&raw_rank) {
            Some(rank) => (rank, true),
            None => (self.default_rank, false),
        };

        self.index.insert(client.clone(), self.entries.len());
        self.entries.push(ClientPriority {
            client,
            raw_rank,
            rank,
            explicit,
        });
    }

    /// Rank of a client; unknown clients get the default rank.
    pub fn rank(&self, client: &str) -> f64 {
        self.index
            .get(client)
            .map(|&i| self.entries[i].rank)
            .unwrap_or(self.default_rank)
    }

    pub fn contains(&self, client: &str) -> bool {
        self.index.contains_key(client)
    }

    /// Compares two clients by rank. On equal rank a listed client goes
    /// before one missing from the table.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.rank(a)
            .total_cmp(&self.rank(b))
            .then_with(|| self.contains(b).cmp(&self.contains(a)))
    }

    /// Clients by ascending rank; ties keep table order.
    pub fn ordered_clients(&self) -> Vec<ClientId> {
        let mut ordered: Vec<&ClientPriority> = self.entries.iter().collect();
        ordered.sort_by(|a, b| a.rank.total_cmp(&b.rank));
        ordered.into_iter().map(|e| e.client.clone()).collect()
    }

    /// How many rows fell back to the default rank.
    pub fn defaulted(&self) -> usize {
        self.entries.iter().filter(|e| !e.explicit).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Coerces a raw cell to a rank. Blank, non-numeric and non-finite cells yield `None`.
pub fn coerce_rank(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|r| r.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_ranks_fall_back_to_default() {
        let table = PriorityTable::from_raw(
            vec![("A", "1"), ("B", "alta"), ("C", ""), ("D", "NaN"), ("E", "2.0")],
            DEFAULT_RANK,
        );

        assert_eq!(table.rank("A"), 1.0);
        assert_eq!(table.rank("B"), DEFAULT_RANK);
        assert_eq!(table.rank("C"), DEFAULT_RANK);
        assert_eq!(table.rank("D"), DEFAULT_RANK);
        assert_eq!(table.rank("E"), 2.0);
        assert_eq!(table.defaulted(), 3);
    }

    #[test]
    fn unknown_clients_get_default_rank() {
        let table = PriorityTable::from_raw(vec![("A", "1")], 7.0);
        assert_eq!(table.rank("Z"), 7.0);
        assert!(!table.contains("Z"));
    }

    #[test]
    fn ordering_is_stable_for_equal_ranks() {
        let table = PriorityTable::from_raw(
            vec![("C", "2"), ("A", "x"), ("B", "2"), ("D", "1"), ("E", "5")],
            DEFAULT_RANK,
        );
        assert_eq!(table.ordered_clients(), vec!["D", "C", "B", "A", "E"]);
    }

    #[test]
    fn listed_clients_win_ties_against_unlisted_ones() {
        let table = PriorityTable::from_raw(vec![("A", "5"), ("B", "1")], DEFAULT_RANK);
        assert_eq!(table.compare("Z", "A"), Ordering::Greater);
        assert_eq!(table.compare("A", "Z"), Ordering::Less);
        assert_eq!(table.compare("B", "Z"), Ordering::Less);
        assert_eq!(table.compare("Y", "Z"), Ordering::Equal);
    }

    #[test]
    fn duplicate_client_keeps_first_row() {
        let table = PriorityTable::from_raw(vec![("A", "3"), ("A", "1")], DEFAULT_RANK);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rank("A"), 3.0);
    }
}
