// src/models.rs
use serde::{Deserialize, Serialize};

/// One household participant. Created and deleted explicitly, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
}

/// A tracked security. `current_price` is entered by hand (there is no
/// external price feed) and may change at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
}

/// One buy (positive cost/shares) or sell (negative) lot. `member` and
/// `symbol` are denormalized name references; nothing enforces that they
/// match a live Member/Symbol, and aggregation silently ignores orphans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub member: String,
    pub symbol: String,
    pub cost: f64,
    pub shares: f64,
    /// Nominally `YYYY-MM-DD`; parsed fail-soft wherever a date is needed.
    pub date: String,
}

/// One dividend receipt event. Same denormalized-reference caveats as
/// [`Transaction`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub id: String,
    pub member: String,
    pub symbol: String,
    pub amount: f64,
    pub date: String,
}

// Create payloads: the same records minus the store-assigned id.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMember {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSymbol {
    pub name: String,
    #[serde(default)]
    pub current_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransaction {
    pub member: String,
    pub symbol: String,
    pub cost: f64,
    pub shares: f64,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDividend {
    pub member: String,
    pub symbol: String,
    pub amount: f64,
    pub date: String,
}

/// A full replacement of one collection, as pushed over the sync channel.
/// There are no partial updates: subscribers swap their in-memory mirror
/// wholesale for the received records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "records", rename_all = "camelCase")]
pub enum Snapshot {
    Members(Vec<Member>),
    Symbols(Vec<Symbol>),
    Transactions(Vec<Transaction>),
    Dividends(Vec<Dividend>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}
