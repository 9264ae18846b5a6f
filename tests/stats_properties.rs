// tests/stats_properties.rs
//! End-to-end properties of the aggregation engine over realistic
//! household-sized inputs, plus the wire shape the presentation layer
//! consumes.

use dividend_tracker::models::{Dividend, Snapshot, Symbol, Transaction};
use dividend_tracker::state::Dashboard;
use dividend_tracker::stats::compute_stats;

fn symbol(name: &str, current_price: f64) -> Symbol {
    Symbol {
        id: format!("sym-{}", name),
        name: name.to_string(),
        current_price,
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

fn div(id: &str, member: &str, sym: &str, amount: f64, date: &str) -> Dividend {
    Dividend {
        id: id.to_string(),
        member: member.to_string(),
        symbol: sym.to_string(),
        amount,
        date: date.to_string(),
    }
}

/// A two-member household with three symbols, partial sells, an orphaned
/// transaction, and a malformed dividend date.
fn household() -> (Vec<Symbol>, Vec<Transaction>, Vec<Dividend>) {
    let symbols = vec![symbol("0050", 120.0), symbol("2330", 600.0), symbol("00878", 21.5)];
    let transactions = vec![
        txn("t1", "amy", "0050", 10_000.0, 100.0, "2024-01-01"),
        txn("t2", "amy", "0050", -5_000.0, -50.0, "2024-06-01"),
        txn("t3", "bob", "2330", 54_000.0, 90.0, "2023-11-20"),
        txn("t4", "bob", "2330", 30_000.0, 50.0, "2024-02-14"),
        txn("t5", "amy", "00878", 4_300.0, 200.0, "2024-03-08"),
        txn("t6", "amy", "DELISTED", 1_234.0, 10.0, "2022-05-05"),
    ];
    let dividends = vec![
        div("d1", "amy", "0050", 300.0, "2024-07-01"),
        div("d2", "bob", "2330", 1_500.0, "2024-04-10"),
        div("d3", "bob", "2330", 1_500.0, "2024-07-10"),
        div("d4", "amy", "00878", 250.0, "2024-07-18"),
        div("d5", "amy", "00878", 80.0, "not-a-date"),
    ];
    (symbols, transactions, dividends)
}

#[test]
fn total_cost_never_leaks_across_the_symbol_partition() {
    let (symbols, transactions, dividends) = household();
    for filter in [None, Some("amy"), Some("bob"), Some("nobody")] {
        let stats = compute_stats(&symbols, &transactions, &dividends, filter);
        let partition: f64 = stats.per_symbol.iter().map(|s| s.cost).sum();
        assert!(
            (stats.total_cost - partition).abs() < 1e-9,
            "leak under filter {:?}",
            filter
        );
    }
}

#[test]
fn narrowing_the_filter_never_increases_totals() {
    let (symbols, transactions, dividends) = household();
    let all = compute_stats(&symbols, &transactions, &dividends, None);
    for member in ["amy", "bob"] {
        let one = compute_stats(&symbols, &transactions, &dividends, Some(member));
        assert!(one.total_cost <= all.total_cost + 1e-9);
        assert!(one.total_dividends <= all.total_dividends + 1e-9);
    }
}

#[test]
fn orphaned_references_contribute_nothing() {
    let (symbols, transactions, dividends) = household();
    let stats = compute_stats(&symbols, &transactions, &dividends, None);
    assert!(stats.per_symbol.iter().all(|s| s.name != "DELISTED"));
    // 10000 - 5000 + 54000 + 30000 + 4300; the DELISTED buy is ignored.
    assert!((stats.total_cost - 93_300.0).abs() < 1e-9);
}

#[test]
fn malformed_dividend_date_counts_only_in_the_flat_total() {
    let (symbols, transactions, dividends) = household();
    let stats = compute_stats(&symbols, &transactions, &dividends, Some("amy"));

    // 300 + 250 + 80 (the malformed-date record still counts here).
    assert!((stats.total_dividends - 630.0).abs() < 1e-9);
    // But only 2024-07 appears as a month.
    assert_eq!(stats.monthly.len(), 1);
    assert_eq!(stats.monthly[0].month, "2024-07");
    assert!((stats.monthly[0].total - 550.0).abs() < 1e-9);
    assert!((stats.average_monthly_dividend - 630.0).abs() < 1e-9);
}

#[test]
fn sells_shrink_totals_but_are_never_lots() {
    let (symbols, transactions, dividends) = household();
    let stats = compute_stats(&symbols, &transactions, &dividends, None);
    for symbol in &stats.per_symbol {
        assert!(symbol.lots.iter().all(|l| l.cost > 0.0));
    }
    let s0050 = stats.per_symbol.iter().find(|s| s.name == "0050").unwrap();
    assert_eq!(s0050.lots.len(), 1);
    assert!((s0050.cost - 5_000.0).abs() < 1e-9);
    assert!((s0050.shares_held - 50.0).abs() < 1e-9);
}

#[test]
fn lots_are_newest_first() {
    let (symbols, transactions, dividends) = household();
    let stats = compute_stats(&symbols, &transactions, &dividends, None);
    let s2330 = stats.per_symbol.iter().find(|s| s.name == "2330").unwrap();
    let dates: Vec<&str> = s2330.lots.iter().map(|l| l.date.as_str()).collect();
    assert_eq!(dates, vec!["2024-02-14", "2023-11-20"]);
}

#[test]
fn identical_inputs_yield_identical_stats() {
    let (symbols, transactions, dividends) = household();
    let first = compute_stats(&symbols, &transactions, &dividends, Some("amy"));
    let second = compute_stats(&symbols, &transactions, &dividends, Some("amy"));
    assert_eq!(first, second);
}

#[test]
fn dashboard_mirrors_feed_the_same_engine() {
    let (symbols, transactions, dividends) = household();
    let direct = compute_stats(&symbols, &transactions, &dividends, Some("bob"));

    let mut dash = Dashboard::new();
    dash.set_filter(Some("bob".to_string()));
    dash.apply_snapshot(Snapshot::Symbols(symbols));
    dash.apply_snapshot(Snapshot::Transactions(transactions));
    dash.apply_snapshot(Snapshot::Dividends(dividends));
    assert_eq!(dash.stats(), &direct);
}

#[test]
fn stats_wire_format_is_camel_case() {
    let (symbols, transactions, dividends) = household();
    let stats = compute_stats(&symbols, &transactions, &dividends, None);
    let value = serde_json::to_value(&stats).unwrap();

    assert!(value.get("totalDividends").is_some());
    assert!(value.get("totalMarketValue").is_some());
    assert!(value.get("overallReturnPct").is_some());
    let first = &value["perSymbol"][0];
    assert!(first.get("sharesHeld").is_some());
    assert!(first.get("returnIncludingDividendsPct").is_some());
    assert!(first["lots"][0].get("recoveryPct").is_some());
}

#[test]
fn snapshot_wire_format_tags_the_collection() {
    let snapshot = Snapshot::Dividends(vec![div("d1", "amy", "0050", 300.0, "2024-07-01")]);
    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["collection"], "dividends");
    assert_eq!(value["records"][0]["symbol"], "0050");

    let back: Snapshot = serde_json::from_value(value).unwrap();
    assert_eq!(back, snapshot);
}
