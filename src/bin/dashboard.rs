// src/bin/dashboard.rs
//! Minimal terminal consumer of the derived statistics: signs in,
//! subscribes to the live snapshot feed, and re-renders whenever the
//! recomputed Stats change. Read-only; it never mutates anything.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use env_logger::Builder;
use log::{error, LevelFilter};

use dividend_tracker::client::ApiClient;
use dividend_tracker::state::Dashboard;
use dividend_tracker::stats::Stats;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    Builder::new()
        .filter_level(LevelFilter::Warn)
        .format_timestamp_secs()
        .init();

    let base_url =
        std::env::var("TRACKER_URL").unwrap_or_else(|_| "http://127.0.0.1:3030".to_string());
    let user_id = std::env::var("TRACKER_USER").unwrap_or_else(|_| "household".to_string());
    let filter_member = std::env::var("TRACKER_MEMBER").ok();

    let mut client = ApiClient::new(base_url);
    if let Err(e) = client.sign_in(&user_id).await {
        error!("Sign-in failed: {}", e);
        return;
    }

    let dashboard = Arc::new(Mutex::new(Dashboard::new()));
    if filter_member.is_some() {
        dashboard.lock().unwrap().set_filter(filter_member);
    }

    let subscription = match client.subscribe(dashboard.clone()) {
        Ok(subscription) => subscription,
        Err(e) => {
            error!("Subscription failed: {}", e);
            return;
        }
    };

    // Snapshots already recompute the stats; this loop only re-renders when
    // the derived value actually changed.
    let mut last_rendered: Option<Stats> = None;
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        if !subscription.is_active() {
            error!("Live sync ended");
            break;
        }
        let (stats, last_error) = {
            let dash = dashboard.lock().unwrap();
            (dash.stats().clone(), dash.last_error().map(str::to_string))
        };
        if let Some(message) = last_error {
            eprintln!("! {}", message);
        }
        if last_rendered.as_ref() != Some(&stats) {
            render(&stats);
            last_rendered = Some(stats);
        }
    }
}

fn render(stats: &Stats) {
    println!();
    println!("== Household dividend dashboard ==");
    println!(
        "cost {:.2} | market value {:.2} | dividends {:.2}",
        stats.total_cost, stats.total_market_value, stats.total_dividends
    );
    println!(
        "recovery {:.1}% | total return {:.1}% | avg monthly dividend {:.2}",
        stats.recovery_pct, stats.overall_return_pct, stats.average_monthly_dividend
    );
    for symbol in &stats.per_symbol {
        println!(
            "  {:<10} shares {:>10.4}  cost {:>12.2}  div {:>10.2}  return {:>7.1}%",
            symbol.name,
            symbol.shares_held,
            symbol.cost,
            symbol.dividends_received,
            symbol.return_including_dividends_pct
        );
        for lot in &symbol.lots {
            println!(
                "      {}  cost {:>12.2}  shares {:>10.4}  recovered {:>6.1}%",
                lot.date, lot.cost, lot.shares, lot.recovery_pct
            );
        }
    }
    for month in stats.monthly.iter().take(6) {
        println!("  {}  {:>10.2}", month.month, month.total);
    }
}
