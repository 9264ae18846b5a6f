// src/state.rs
//! Client-side dashboard state.
//!
//! The [`Dashboard`] exclusively owns the four in-memory collection mirrors.
//! Nothing mutates them in place: every change goes to the store and comes
//! back as a full-collection [`Snapshot`], which replaces the mirror
//! wholesale and triggers a complete recomputation of the derived
//! statistics.

use std::collections::HashMap;

use crate::models::{Dividend, Member, Snapshot, Symbol, Transaction};
use crate::stats::{compute_stats, Stats};

/// A pending, unconfirmed edit of one record. Drafts live beside the
/// mirrors, keyed by record id, and are discarded only on confirmed
/// write-back; a failed remote operation leaves the draft (and the
/// last-known-good mirrors) untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum DraftRecord {
    Member(Member),
    Symbol(Symbol),
    Transaction(Transaction),
    Dividend(Dividend),
}

impl DraftRecord {
    pub fn id(&self) -> &str {
        match self {
            DraftRecord::Member(m) => &m.id,
            DraftRecord::Symbol(s) => &s.id,
            DraftRecord::Transaction(t) => &t.id,
            DraftRecord::Dividend(d) => &d.id,
        }
    }
}

#[derive(Debug, Default)]
pub struct Dashboard {
    members: Vec<Member>,
    symbols: Vec<Symbol>,
    transactions: Vec<Transaction>,
    dividends: Vec<Dividend>,
    filter_member: Option<String>,
    drafts: HashMap<String, DraftRecord>,
    last_error: Option<String>,
    stats: Stats,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace one mirror with a received snapshot and recompute the stats.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        match snapshot {
            Snapshot::Members(records) => self.members = records,
            Snapshot::Symbols(records) => self.symbols = records,
            Snapshot::Transactions(records) => self.transactions = records,
            Snapshot::Dividends(records) => self.dividends = records,
        }
        self.recompute();
    }

    /// Set the member filter: `None` means the whole household.
    pub fn set_filter(&mut self, filter: Option<String>) {
        self.filter_member = filter;
        self.recompute();
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter_member.as_deref()
    }

    /// The derived statistics for the current mirrors and filter.
    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// The member roster, for the UI's filter picker. Not an input to the
    /// aggregation itself.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn dividends(&self) -> &[Dividend] {
        &self.dividends
    }

    // ---- drafts ----

    pub fn stage_draft(&mut self, draft: DraftRecord) {
        self.drafts.insert(draft.id().to_string(), draft);
    }

    pub fn draft(&self, id: &str) -> Option<&DraftRecord> {
        self.drafts.get(id)
    }

    /// Discard a draft after its write-back was confirmed (or the user gave
    /// up on the edit). Returns the removed draft, if any.
    pub fn discard_draft(&mut self, id: &str) -> Option<DraftRecord> {
        self.drafts.remove(id)
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }

    // ---- error display region ----

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn recompute(&mut self) {
        self.stats = compute_stats(
            &self.symbols,
            &self.transactions,
            &self.dividends,
            self.filter_member.as_deref(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str, price: f64) -> Symbol {
        Symbol {
            id: format!("sym-{}", name),
            name: name.to_string(),
            current_price: price,
        }
    }

    fn txn(id: &str, member: &str, sym: &str, cost: f64, shares: f64, date: &str) -> Transaction {
        Transaction {
            id: id.to_string(),
            member: member.to_string(),
            symbol: sym.to_string(),
            cost,
            shares,
            date: date.to_string(),
        }
    }

    #[test]
    fn snapshots_replace_and_recompute() {
        let mut dash = Dashboard::new();
        dash.apply_snapshot(Snapshot::Symbols(vec![symbol("A", 10.0)]));
        dash.apply_snapshot(Snapshot::Transactions(vec![txn(
            "t1", "amy", "A", 100.0, 10.0, "2024-01-05",
        )]));
        assert_eq!(dash.stats().per_symbol.len(), 1);
        assert_eq!(dash.stats().total_cost, 100.0);

        // A snapshot is a replacement, not a merge.
        dash.apply_snapshot(Snapshot::Transactions(vec![]));
        assert!(dash.stats().per_symbol.is_empty());
        assert_eq!(dash.stats().total_cost, 0.0);
    }

    #[test]
    fn filter_change_recomputes() {
        let mut dash = Dashboard::new();
        dash.apply_snapshot(Snapshot::Symbols(vec![symbol("A", 10.0)]));
        dash.apply_snapshot(Snapshot::Transactions(vec![
            txn("t1", "amy", "A", 100.0, 10.0, "2024-01-05"),
            txn("t2", "bob", "A", 50.0, 5.0, "2024-01-06"),
        ]));
        assert_eq!(dash.stats().total_cost, 150.0);

        dash.set_filter(Some("bob".to_string()));
        assert_eq!(dash.stats().total_cost, 50.0);

        dash.set_filter(None);
        assert_eq!(dash.stats().total_cost, 150.0);
    }

    #[test]
    fn draft_lifecycle() {
        let mut dash = Dashboard::new();
        let edited = DraftRecord::Symbol(symbol("A", 42.0));
        dash.stage_draft(edited.clone());
        assert_eq!(dash.draft_count(), 1);
        assert_eq!(dash.draft("sym-A"), Some(&edited));

        // Confirmed write-back discards the draft.
        assert_eq!(dash.discard_draft("sym-A"), Some(edited));
        assert_eq!(dash.draft_count(), 0);
        assert!(dash.discard_draft("sym-A").is_none());
    }

    #[test]
    fn drafts_do_not_affect_stats() {
        let mut dash = Dashboard::new();
        dash.apply_snapshot(Snapshot::Symbols(vec![symbol("A", 10.0)]));
        dash.apply_snapshot(Snapshot::Transactions(vec![txn(
            "t1", "amy", "A", 100.0, 10.0, "2024-01-05",
        )]));
        let before = dash.stats().clone();

        dash.stage_draft(DraftRecord::Transaction(txn(
            "t1", "amy", "A", 999.0, 99.0, "2024-01-05",
        )));
        assert_eq!(dash.stats(), &before);
    }

    #[test]
    fn error_region() {
        let mut dash = Dashboard::new();
        assert!(dash.last_error().is_none());
        dash.set_error("Failed to add dividend: connection refused");
        assert_eq!(
            dash.last_error(),
            Some("Failed to add dividend: connection refused")
        );
        dash.clear_error();
        assert!(dash.last_error().is_none());
    }
}
