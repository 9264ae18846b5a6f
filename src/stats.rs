// src/stats.rs
//! Portfolio aggregation engine.
//!
//! A pure function of the symbol roster, the transaction history, and the
//! dividend history, plus an optional member filter. Every input change
//! triggers a full recomputation from scratch; the collections are
//! household-sized, so there is no incremental maintenance. Degenerate
//! inputs (unparseable dates, orphaned name references, non-positive
//! denominators) degrade to defined zero/skip values and never error.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Dividend, Symbol, Transaction};

/// Fixed-point scale for share accumulation: one micro-share. Summing many
/// fractional share quantities as raw floats drifts; integer micro-shares
/// do not.
pub const SHARE_SCALE: i64 = 1_000_000;

/// Derived portfolio statistics, the sole output of the engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_dividends: f64,
    pub total_cost: f64,
    pub total_market_value: f64,
    /// Cumulative dividends against cost basis, as a percentage.
    pub recovery_pct: f64,
    /// Unrealized market-value change plus dividends against cost basis.
    pub overall_return_pct: f64,
    pub per_symbol: Vec<SymbolStats>,
    /// Dividend cash-flow by calendar month, most recent month first.
    pub monthly: Vec<MonthlyDividend>,
    pub average_monthly_dividend: f64,
}

/// Statistics for one symbol under the active filter. Only symbols with a
/// strictly positive net cost appear in [`Stats::per_symbol`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStats {
    pub name: String,
    pub cost: f64,
    pub shares_held: f64,
    pub dividends_received: f64,
    pub current_price: f64,
    pub return_including_dividends_pct: f64,
    /// Positive-cost purchase transactions, most recent first.
    pub lots: Vec<LotStats>,
}

/// One purchase lot with its individual recovery progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotStats {
    pub id: String,
    pub date: String,
    pub cost: f64,
    pub shares: f64,
    pub recovery_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyDividend {
    /// Calendar month key, `YYYY-MM`.
    pub month: String,
    pub total: f64,
}

/// Compute portfolio statistics for the given collections and member filter.
///
/// `filter` is `None` for the whole household or `Some(name)` for an exact
/// `Member.name` match. Filtering happens before any aggregation; the
/// symbol roster and `current_price` are the only filter-independent
/// inputs, and a symbol with no net-positive cost under the filter is
/// excluded regardless of its global activity.
pub fn compute_stats(
    symbols: &[Symbol],
    transactions: &[Transaction],
    dividends: &[Dividend],
    filter: Option<&str>,
) -> Stats {
    let txns: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| matches_filter(&t.member, filter))
        .collect();
    let divs: Vec<&Dividend> = dividends
        .iter()
        .filter(|d| matches_filter(&d.member, filter))
        .collect();

    // Orphaned references and unparseable dates still count here; only the
    // partitioned figures below drop them.
    let total_dividends: f64 = divs.iter().map(|d| d.amount).sum();

    let per_symbol: Vec<SymbolStats> = symbols
        .iter()
        .filter_map(|symbol| symbol_stats(symbol, &txns, &divs))
        .collect();

    // Totals are the partition sums: aggregation partitions transactions
    // over symbol, then sums, so no entity is double-visited and
    // `total_cost == Σ per_symbol.cost` holds for every input.
    let total_cost: f64 = per_symbol.iter().map(|s| s.cost).sum();
    let total_market_value: f64 = per_symbol
        .iter()
        .map(|s| s.shares_held * s.current_price)
        .sum();

    let recovery_pct = pct_of_cost(total_dividends, total_cost);
    let overall_return_pct =
        pct_of_cost(total_market_value + total_dividends - total_cost, total_cost);

    let (monthly, average_monthly_dividend) = monthly_breakdown(&divs, total_dividends);

    Stats {
        total_dividends,
        total_cost,
        total_market_value,
        recovery_pct,
        overall_return_pct,
        per_symbol,
        monthly,
        average_monthly_dividend,
    }
}

fn matches_filter(member: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |name| member == name)
}

/// `part / basis * 100`, zero whenever the cost basis is not positive.
fn pct_of_cost(part: f64, basis: f64) -> f64 {
    if basis > 0.0 {
        part / basis * 100.0
    } else {
        0.0
    }
}

fn to_micro_shares(shares: f64) -> i64 {
    (shares * SHARE_SCALE as f64).round() as i64
}

fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Fold one symbol's filtered transactions and dividends into its stats.
/// Returns `None` for symbols with net cost <= 0 under the filter; those
/// are dropped from the output entirely.
fn symbol_stats(
    symbol: &Symbol,
    txns: &[&Transaction],
    divs: &[&Dividend],
) -> Option<SymbolStats> {
    let mut cost = 0.0_f64;
    let mut share_micros = 0_i64;
    let mut sym_txns: Vec<&Transaction> = Vec::new();
    for txn in txns.iter().copied().filter(|t| t.symbol == symbol.name) {
        cost += txn.cost;
        share_micros += to_micro_shares(txn.shares);
        sym_txns.push(txn);
    }
    if cost <= 0.0 {
        return None;
    }
    let shares_held = share_micros as f64 / SHARE_SCALE as f64;

    let sym_divs: Vec<&Dividend> = divs
        .iter()
        .filter(|d| d.symbol == symbol.name)
        .copied()
        .collect();
    let dividends_received: f64 = sym_divs.iter().map(|d| d.amount).sum();

    let lots = lot_stats(&sym_txns, &sym_divs, shares_held);

    let return_including_dividends_pct = pct_of_cost(
        shares_held * symbol.current_price + dividends_received - cost,
        cost,
    );

    Some(SymbolStats {
        name: symbol.name.clone(),
        cost,
        shares_held,
        dividends_received,
        current_price: symbol.current_price,
        return_including_dividends_pct,
        lots,
    })
}

/// Build the visible lot list for one symbol: only strictly-positive-cost
/// transactions become lots (sells reduce the totals above but never appear
/// as a row), sorted by date descending with unparseable dates last and
/// ties kept in input order.
fn lot_stats(sym_txns: &[&Transaction], sym_divs: &[&Dividend], shares_held: f64) -> Vec<LotStats> {
    let mut lots: Vec<LotStats> = sym_txns
        .iter()
        .copied()
        .filter(|t| t.cost > 0.0)
        .map(|txn| LotStats {
            id: txn.id.clone(),
            date: txn.date.clone(),
            cost: txn.cost,
            shares: txn.shares,
            recovery_pct: lot_recovery(txn, sym_divs, shares_held),
        })
        .collect();
    lots.sort_by(|a, b| match (parse_date(&a.date), parse_date(&b.date)) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    lots
}

/// Dividends paid on the symbol on or after the lot's date, attributed to
/// the lot in proportion to its share of the symbol's current holdings.
/// A lot or dividend with an unparseable date never participates.
fn lot_recovery(lot: &Transaction, sym_divs: &[&Dividend], shares_held: f64) -> f64 {
    if lot.cost <= 0.0 || shares_held == 0.0 {
        return 0.0;
    }
    let lot_date = match parse_date(&lot.date) {
        Some(date) => date,
        None => return 0.0,
    };
    let received: f64 = sym_divs
        .iter()
        .filter(|d| parse_date(&d.date).map_or(false, |date| date >= lot_date))
        .map(|d| d.amount)
        .sum();
    received * (lot.shares / shares_held) / lot.cost * 100.0
}

/// Group filtered dividends by calendar month. Records whose date does not
/// parse are skipped here (and in the average's denominator) but were
/// already counted in `total_dividends`.
fn monthly_breakdown(divs: &[&Dividend], total_dividends: f64) -> (Vec<MonthlyDividend>, f64) {
    let mut by_month: BTreeMap<String, f64> = BTreeMap::new();
    for div in divs {
        if let Some(date) = parse_date(&div.date) {
            *by_month.entry(date.format("%Y-%m").to_string()).or_insert(0.0) += div.amount;
        }
    }
    let month_count = by_month.len();
    let monthly: Vec<MonthlyDividend> = by_month
        .into_iter()
        .rev()
        .map(|(month, total)| MonthlyDividend { month, total })
        .collect();
    let average = if month_count > 0 {
        total_dividends / month_count as f64
    } else {
        0.0
    };
    (monthly, average)
}
