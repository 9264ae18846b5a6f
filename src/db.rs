// src/db.rs
use log::info;
use scylla::{query::Query, Session, SessionBuilder};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    Dividend, Member, NewDividend, NewMember, NewSymbol, NewTransaction, Symbol, Transaction,
};

pub type DbError = Box<dyn std::error::Error + Send + Sync>;

/// Connect to ScyllaDB and bootstrap the keyspace and the four collection
/// tables. Every table is partitioned by `user_id` (the identity-provider
/// namespace) with the record id as clustering key, so one partition read
/// yields a full collection snapshot.
pub async fn init(config: &Config) -> Result<Session, DbError> {
    let session = SessionBuilder::new()
        .known_node(config.scylla_node.as_str())
        .build()
        .await?;

    session.query("CREATE KEYSPACE IF NOT EXISTS dividend_tracker WITH REPLICATION = {'class': 'SimpleStrategy', 'replication_factor': 1}", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS dividend_tracker.members (user_id TEXT, id TEXT, name TEXT, PRIMARY KEY ((user_id), id))", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS dividend_tracker.symbols (user_id TEXT, id TEXT, name TEXT, current_price DOUBLE, PRIMARY KEY ((user_id), id))", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS dividend_tracker.transactions (user_id TEXT, id TEXT, member TEXT, symbol TEXT, cost DOUBLE, shares DOUBLE, date TEXT, PRIMARY KEY ((user_id), id))", &[]).await?;
    session.query("CREATE TABLE IF NOT EXISTS dividend_tracker.dividends (user_id TEXT, id TEXT, member TEXT, symbol TEXT, amount DOUBLE, date TEXT, PRIMARY KEY ((user_id), id))", &[]).await?;

    info!("Successfully connected to ScyllaDB.");
    Ok(session)
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ---- members ----

pub async fn add_member(
    session: &Session,
    user_id: &str,
    new: NewMember,
) -> Result<Member, DbError> {
    let member = Member {
        id: new_id(),
        name: new.name,
    };
    update_member(session, user_id, &member).await?;
    Ok(member)
}

/// CQL inserts are upserts, so create and update share one statement.
pub async fn update_member(
    session: &Session,
    user_id: &str,
    member: &Member,
) -> Result<(), DbError> {
    let query =
        Query::new("INSERT INTO dividend_tracker.members (user_id, id, name) VALUES (?, ?, ?)");
    session
        .query(query, (user_id, member.id.as_str(), member.name.as_str()))
        .await?;
    Ok(())
}

pub async fn delete_member(session: &Session, user_id: &str, id: &str) -> Result<(), DbError> {
    let query = Query::new("DELETE FROM dividend_tracker.members WHERE user_id = ? AND id = ?");
    session.query(query, (user_id, id)).await?;
    Ok(())
}

pub async fn list_members(session: &Session, user_id: &str) -> Result<Vec<Member>, DbError> {
    let query = Query::new("SELECT id, name FROM dividend_tracker.members WHERE user_id = ?");
    let result = session.query(query, (user_id,)).await?;
    let members = result
        .rows
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            Some(Member {
                id: row.columns[0].as_ref()?.as_text()?.to_string(),
                name: row.columns[1].as_ref()?.as_text()?.to_string(),
            })
        })
        .collect();
    Ok(members)
}

// ---- symbols ----

pub async fn add_symbol(
    session: &Session,
    user_id: &str,
    new: NewSymbol,
) -> Result<Symbol, DbError> {
    let symbol = Symbol {
        id: new_id(),
        name: new.name,
        current_price: new.current_price,
    };
    update_symbol(session, user_id, &symbol).await?;
    Ok(symbol)
}

pub async fn update_symbol(
    session: &Session,
    user_id: &str,
    symbol: &Symbol,
) -> Result<(), DbError> {
    let query = Query::new(
        "INSERT INTO dividend_tracker.symbols (user_id, id, name, current_price) VALUES (?, ?, ?, ?)",
    );
    session
        .query(
            query,
            (
                user_id,
                symbol.id.as_str(),
                symbol.name.as_str(),
                symbol.current_price,
            ),
        )
        .await?;
    Ok(())
}

pub async fn delete_symbol(session: &Session, user_id: &str, id: &str) -> Result<(), DbError> {
    let query = Query::new("DELETE FROM dividend_tracker.symbols WHERE user_id = ? AND id = ?");
    session.query(query, (user_id, id)).await?;
    Ok(())
}

pub async fn list_symbols(session: &Session, user_id: &str) -> Result<Vec<Symbol>, DbError> {
    let query = Query::new(
        "SELECT id, name, current_price FROM dividend_tracker.symbols WHERE user_id = ?",
    );
    let result = session.query(query, (user_id,)).await?;
    let symbols = result
        .rows
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            Some(Symbol {
                id: row.columns[0].as_ref()?.as_text()?.to_string(),
                name: row.columns[1].as_ref()?.as_text()?.to_string(),
                current_price: row.columns[2].as_ref()?.as_double()?,
            })
        })
        .collect();
    Ok(symbols)
}

// ---- transactions ----

pub async fn add_transaction(
    session: &Session,
    user_id: &str,
    new: NewTransaction,
) -> Result<Transaction, DbError> {
    let transaction = Transaction {
        id: new_id(),
        member: new.member,
        symbol: new.symbol,
        cost: new.cost,
        shares: new.shares,
        date: new.date,
    };
    update_transaction(session, user_id, &transaction).await?;
    Ok(transaction)
}

pub async fn update_transaction(
    session: &Session,
    user_id: &str,
    transaction: &Transaction,
) -> Result<(), DbError> {
    let query = Query::new(
        "INSERT INTO dividend_tracker.transactions (user_id, id, member, symbol, cost, shares, date) VALUES (?, ?, ?, ?, ?, ?, ?)",
    );
    session
        .query(
            query,
            (
                user_id,
                transaction.id.as_str(),
                transaction.member.as_str(),
                transaction.symbol.as_str(),
                transaction.cost,
                transaction.shares,
                transaction.date.as_str(),
            ),
        )
        .await?;
    Ok(())
}

pub async fn delete_transaction(session: &Session, user_id: &str, id: &str) -> Result<(), DbError> {
    let query =
        Query::new("DELETE FROM dividend_tracker.transactions WHERE user_id = ? AND id = ?");
    session.query(query, (user_id, id)).await?;
    Ok(())
}

pub async fn list_transactions(
    session: &Session,
    user_id: &str,
) -> Result<Vec<Transaction>, DbError> {
    let query = Query::new(
        "SELECT id, member, symbol, cost, shares, date FROM dividend_tracker.transactions WHERE user_id = ?",
    );
    let result = session.query(query, (user_id,)).await?;
    let transactions = result
        .rows
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            Some(Transaction {
                id: row.columns[0].as_ref()?.as_text()?.to_string(),
                member: row.columns[1].as_ref()?.as_text()?.to_string(),
                symbol: row.columns[2].as_ref()?.as_text()?.to_string(),
                cost: row.columns[3].as_ref()?.as_double()?,
                shares: row.columns[4].as_ref()?.as_double()?,
                date: row.columns[5].as_ref()?.as_text()?.to_string(),
            })
        })
        .collect();
    Ok(transactions)
}

// ---- dividends ----

pub async fn add_dividend(
    session: &Session,
    user_id: &str,
    new: NewDividend,
) -> Result<Dividend, DbError> {
    let dividend = Dividend {
        id: new_id(),
        member: new.member,
        symbol: new.symbol,
        amount: new.amount,
        date: new.date,
    };
    update_dividend(session, user_id, &dividend).await?;
    Ok(dividend)
}

pub async fn update_dividend(
    session: &Session,
    user_id: &str,
    dividend: &Dividend,
) -> Result<(), DbError> {
    let query = Query::new(
        "INSERT INTO dividend_tracker.dividends (user_id, id, member, symbol, amount, date) VALUES (?, ?, ?, ?, ?, ?)",
    );
    session
        .query(
            query,
            (
                user_id,
                dividend.id.as_str(),
                dividend.member.as_str(),
                dividend.symbol.as_str(),
                dividend.amount,
                dividend.date.as_str(),
            ),
        )
        .await?;
    Ok(())
}

pub async fn delete_dividend(session: &Session, user_id: &str, id: &str) -> Result<(), DbError> {
    let query = Query::new("DELETE FROM dividend_tracker.dividends WHERE user_id = ? AND id = ?");
    session.query(query, (user_id, id)).await?;
    Ok(())
}

pub async fn list_dividends(session: &Session, user_id: &str) -> Result<Vec<Dividend>, DbError> {
    let query = Query::new(
        "SELECT id, member, symbol, amount, date FROM dividend_tracker.dividends WHERE user_id = ?",
    );
    let result = session.query(query, (user_id,)).await?;
    let dividends = result
        .rows
        .unwrap_or_default()
        .into_iter()
        .filter_map(|row| {
            Some(Dividend {
                id: row.columns[0].as_ref()?.as_text()?.to_string(),
                member: row.columns[1].as_ref()?.as_text()?.to_string(),
                symbol: row.columns[2].as_ref()?.as_text()?.to_string(),
                amount: row.columns[3].as_ref()?.as_double()?,
                date: row.columns[4].as_ref()?.as_text()?.to_string(),
            })
        })
        .collect();
    Ok(dividends)
}
