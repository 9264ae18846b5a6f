// src/api.rs
use std::convert::Infallible;
use std::sync::Arc;

use log::{error, info};
use scylla::Session;
use serde::Deserialize;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::auth;
use crate::config::Config;
use crate::db;
use crate::error::CustomError;
use crate::models::{
    Dividend, Member, NewDividend, NewMember, NewSymbol, NewTransaction, SignInRequest, Snapshot,
    Symbol, TokenResponse, Transaction,
};
use crate::stats::compute_stats;
use crate::sync::SnapshotHub;
use crate::websocket;

#[derive(Deserialize)]
pub struct StatsQuery {
    /// Exact member name; omitted means the whole household.
    pub member: Option<String>,
}

pub fn routes(
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let signin = warp::path("signin")
        .and(warp::post())
        .and(warp::body::json())
        .and(with_config(config.clone()))
        .and_then(signin_handler);

    let stats = warp::path("stats")
        .and(warp::get())
        .and(auth::with_user(config.clone()))
        .and(warp::query::<StatsQuery>())
        .and(with_session(session.clone()))
        .and_then(stats_handler);

    let ws = warp::path("ws")
        .and(warp::query::<websocket::WsQuery>())
        .and(warp::ws())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and(with_config(config.clone()))
        .and_then(websocket::ws_handler);

    signin
        .or(stats)
        .or(ws)
        .or(member_routes(session.clone(), hub.clone(), config.clone()))
        .or(symbol_routes(session.clone(), hub.clone(), config.clone()))
        .or(transaction_routes(
            session.clone(),
            hub.clone(),
            config.clone(),
        ))
        .or(dividend_routes(session, hub, config))
}

fn with_session(
    session: Arc<Session>,
) -> impl Filter<Extract = (Arc<Session>,), Error = Infallible> + Clone {
    warp::any().map(move || session.clone())
}

fn with_hub(hub: Arc<SnapshotHub>) -> impl Filter<Extract = (Arc<SnapshotHub>,), Error = Infallible> + Clone {
    warp::any().map(move || hub.clone())
}

fn with_config(
    config: Arc<Config>,
) -> impl Filter<Extract = (Arc<Config>,), Error = Infallible> + Clone {
    warp::any().map(move || config.clone())
}

async fn signin_handler(
    request: SignInRequest,
    config: Arc<Config>,
) -> Result<impl Reply, Rejection> {
    match auth::create_token(&request.user_id, &config) {
        Ok(token) => {
            info!("Issued token for user {}", request.user_id);
            Ok(warp::reply::json(&TokenResponse { token }))
        }
        Err(e) => {
            error!("Failed to issue token: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn stats_handler(
    user_id: String,
    query: StatsQuery,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    let symbols = load(db::list_symbols(&session, &user_id).await)?;
    let transactions = load(db::list_transactions(&session, &user_id).await)?;
    let dividends = load(db::list_dividends(&session, &user_id).await)?;
    let stats = compute_stats(&symbols, &transactions, &dividends, query.member.as_deref());
    Ok(warp::reply::json(&stats))
}

fn load<T>(result: Result<T, db::DbError>) -> Result<T, Rejection> {
    result.map_err(|e| {
        error!("Failed to load collection: {}", e);
        warp::reject::custom(CustomError {
            message: e.to_string(),
        })
    })
}

/// Reload one collection from the store and broadcast it. Publishing is
/// best-effort: the mutation already committed, so a failed reload only
/// delays subscribers until the next snapshot.
async fn publish_members(session: &Session, hub: &SnapshotHub, user_id: &str) {
    match db::list_members(session, user_id).await {
        Ok(records) => hub.publish(user_id, Snapshot::Members(records)),
        Err(e) => error!("Failed to publish members snapshot: {}", e),
    }
}

async fn publish_symbols(session: &Session, hub: &SnapshotHub, user_id: &str) {
    match db::list_symbols(session, user_id).await {
        Ok(records) => hub.publish(user_id, Snapshot::Symbols(records)),
        Err(e) => error!("Failed to publish symbols snapshot: {}", e),
    }
}

async fn publish_transactions(session: &Session, hub: &SnapshotHub, user_id: &str) {
    match db::list_transactions(session, user_id).await {
        Ok(records) => hub.publish(user_id, Snapshot::Transactions(records)),
        Err(e) => error!("Failed to publish transactions snapshot: {}", e),
    }
}

async fn publish_dividends(session: &Session, hub: &SnapshotHub, user_id: &str) {
    match db::list_dividends(session, user_id).await {
        Ok(records) => hub.publish(user_id, Snapshot::Dividends(records)),
        Err(e) => error!("Failed to publish dividends snapshot: {}", e),
    }
}

// ---- members ----

fn member_routes(
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path("members")
        .and(warp::get())
        .and(auth::with_user(config.clone()))
        .and(with_session(session.clone()))
        .and_then(list_members_handler);

    let add = warp::path("members")
        .and(warp::post())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(add_member_handler);

    let update = warp::path("members")
        .and(warp::put())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(update_member_handler);

    let delete = warp::path!("members" / String)
        .and(warp::delete())
        .and(auth::with_user(config))
        .and(with_session(session))
        .and(with_hub(hub))
        .and_then(delete_member_handler);

    list.or(add).or(update).or(delete)
}

async fn list_members_handler(
    user_id: String,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    let members = load(db::list_members(&session, &user_id).await)?;
    Ok(warp::reply::json(&members))
}

async fn add_member_handler(
    user_id: String,
    new: NewMember,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::add_member(&session, &user_id, new).await {
        Ok(member) => {
            info!("Member {} added for {}", member.name, user_id);
            publish_members(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&member),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to add member: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn update_member_handler(
    user_id: String,
    member: Member,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::update_member(&session, &user_id, &member).await {
        Ok(()) => {
            info!("Member {} updated for {}", member.id, user_id);
            publish_members(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Member updated", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to update member: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn delete_member_handler(
    id: String,
    user_id: String,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::delete_member(&session, &user_id, &id).await {
        Ok(()) => {
            info!("Member {} deleted for {}", id, user_id);
            publish_members(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Member deleted", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to delete member: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

// ---- symbols ----

fn symbol_routes(
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path("symbols")
        .and(warp::get())
        .and(auth::with_user(config.clone()))
        .and(with_session(session.clone()))
        .and_then(list_symbols_handler);

    let add = warp::path("symbols")
        .and(warp::post())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(add_symbol_handler);

    let update = warp::path("symbols")
        .and(warp::put())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(update_symbol_handler);

    let delete = warp::path!("symbols" / String)
        .and(warp::delete())
        .and(auth::with_user(config))
        .and(with_session(session))
        .and(with_hub(hub))
        .and_then(delete_symbol_handler);

    list.or(add).or(update).or(delete)
}

async fn list_symbols_handler(
    user_id: String,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    let symbols = load(db::list_symbols(&session, &user_id).await)?;
    Ok(warp::reply::json(&symbols))
}

async fn add_symbol_handler(
    user_id: String,
    new: NewSymbol,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::add_symbol(&session, &user_id, new).await {
        Ok(symbol) => {
            info!("Symbol {} added for {}", symbol.name, user_id);
            publish_symbols(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&symbol),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to add symbol: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn update_symbol_handler(
    user_id: String,
    symbol: Symbol,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::update_symbol(&session, &user_id, &symbol).await {
        Ok(()) => {
            info!("Symbol {} updated for {}", symbol.id, user_id);
            publish_symbols(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Symbol updated", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to update symbol: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn delete_symbol_handler(
    id: String,
    user_id: String,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::delete_symbol(&session, &user_id, &id).await {
        Ok(()) => {
            info!("Symbol {} deleted for {}", id, user_id);
            publish_symbols(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Symbol deleted", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to delete symbol: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

// ---- transactions ----

fn transaction_routes(
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path("transactions")
        .and(warp::get())
        .and(auth::with_user(config.clone()))
        .and(with_session(session.clone()))
        .and_then(list_transactions_handler);

    let add = warp::path("transactions")
        .and(warp::post())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(add_transaction_handler);

    let update = warp::path("transactions")
        .and(warp::put())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(update_transaction_handler);

    let delete = warp::path!("transactions" / String)
        .and(warp::delete())
        .and(auth::with_user(config))
        .and(with_session(session))
        .and(with_hub(hub))
        .and_then(delete_transaction_handler);

    list.or(add).or(update).or(delete)
}

async fn list_transactions_handler(
    user_id: String,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    let transactions = load(db::list_transactions(&session, &user_id).await)?;
    Ok(warp::reply::json(&transactions))
}

async fn add_transaction_handler(
    user_id: String,
    new: NewTransaction,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::add_transaction(&session, &user_id, new).await {
        Ok(transaction) => {
            info!(
                "Transaction on {} added for {}",
                transaction.symbol, user_id
            );
            publish_transactions(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&transaction),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to add transaction: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn update_transaction_handler(
    user_id: String,
    transaction: Transaction,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::update_transaction(&session, &user_id, &transaction).await {
        Ok(()) => {
            info!("Transaction {} updated for {}", transaction.id, user_id);
            publish_transactions(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                "Transaction updated",
                StatusCode::OK,
            ))
        }
        Err(e) => {
            error!("Failed to update transaction: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn delete_transaction_handler(
    id: String,
    user_id: String,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::delete_transaction(&session, &user_id, &id).await {
        Ok(()) => {
            info!("Transaction {} deleted for {}", id, user_id);
            publish_transactions(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                "Transaction deleted",
                StatusCode::OK,
            ))
        }
        Err(e) => {
            error!("Failed to delete transaction: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

// ---- dividends ----

fn dividend_routes(
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
    config: Arc<Config>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let list = warp::path("dividends")
        .and(warp::get())
        .and(auth::with_user(config.clone()))
        .and(with_session(session.clone()))
        .and_then(list_dividends_handler);

    let add = warp::path("dividends")
        .and(warp::post())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(add_dividend_handler);

    let update = warp::path("dividends")
        .and(warp::put())
        .and(auth::with_user(config.clone()))
        .and(warp::body::json())
        .and(with_session(session.clone()))
        .and(with_hub(hub.clone()))
        .and_then(update_dividend_handler);

    let delete = warp::path!("dividends" / String)
        .and(warp::delete())
        .and(auth::with_user(config))
        .and(with_session(session))
        .and(with_hub(hub))
        .and_then(delete_dividend_handler);

    list.or(add).or(update).or(delete)
}

async fn list_dividends_handler(
    user_id: String,
    session: Arc<Session>,
) -> Result<impl Reply, Rejection> {
    let dividends = load(db::list_dividends(&session, &user_id).await)?;
    Ok(warp::reply::json(&dividends))
}

async fn add_dividend_handler(
    user_id: String,
    new: NewDividend,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::add_dividend(&session, &user_id, new).await {
        Ok(dividend) => {
            info!("Dividend on {} added for {}", dividend.symbol, user_id);
            publish_dividends(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status(
                warp::reply::json(&dividend),
                StatusCode::CREATED,
            ))
        }
        Err(e) => {
            error!("Failed to add dividend: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn update_dividend_handler(
    user_id: String,
    dividend: Dividend,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::update_dividend(&session, &user_id, &dividend).await {
        Ok(()) => {
            info!("Dividend {} updated for {}", dividend.id, user_id);
            publish_dividends(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Dividend updated", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to update dividend: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}

async fn delete_dividend_handler(
    id: String,
    user_id: String,
    session: Arc<Session>,
    hub: Arc<SnapshotHub>,
) -> Result<impl Reply, Rejection> {
    match db::delete_dividend(&session, &user_id, &id).await {
        Ok(()) => {
            info!("Dividend {} deleted for {}", id, user_id);
            publish_dividends(&session, &hub, &user_id).await;
            Ok(warp::reply::with_status("Dividend deleted", StatusCode::OK))
        }
        Err(e) => {
            error!("Failed to delete dividend: {}", e);
            Err(warp::reject::custom(CustomError {
                message: e.to_string(),
            }))
        }
    }
}
