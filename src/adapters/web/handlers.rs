//! HTTP request handlers for the web adapter.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::price_process::{DEFAULT_MU, DEFAULT_SIGMA};
use crate::domain::simulator::Order;
use crate::domain::trade::Side;

use super::{ApiError, AppState};

type Fields = Map<String, Value>;

fn respond(status: StatusCode, message: &str, data: Value) -> Response {
    let mut payload = Fields::new();
    payload.insert("success".into(), Value::Bool(true));
    payload.insert("message".into(), Value::String(message.to_string()));
    if let Value::Object(fields) = data {
        payload.extend(fields);
    }
    (status, Json(Value::Object(payload))).into_response()
}

fn ok(message: &str, data: Value) -> Response {
    respond(StatusCode::OK, message, data)
}

/// Parse the request body as a JSON object. An empty or non-object body is
/// an error only when `required`.
fn read_json(body: &Bytes, required: bool) -> Result<Fields, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ if required => Err(ApiError::bad_request("Request body must be valid JSON")),
        _ => Ok(Fields::new()),
    }
}

fn symbol_field(fields: &Fields) -> Result<String, ApiError> {
    let symbol = fields
        .get("symbol")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    if symbol.is_empty() {
        return Err(ApiError::bad_request("symbol is required"));
    }
    Ok(symbol)
}

/// Integer-valued JSON number or numeric string.
fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

/// Whole floats inside the `i64` range; `as` would saturate anything larger.
fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < 9.2e18).then_some(f as i64)
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn qty_field(fields: &Fields) -> Result<i64, ApiError> {
    let qty = fields
        .get("qty")
        .and_then(integer_value)
        .ok_or_else(|| ApiError::bad_request("qty must be an integer"))?;
    if qty <= 0 {
        return Err(ApiError::bad_request("qty must be > 0"));
    }
    Ok(qty)
}

fn optional_number(fields: &Fields, name: &str) -> Result<Option<f64>, ApiError> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => number_value(v)
            .map(Some)
            .ok_or_else(|| ApiError::bad_request(format!("{name} must be a number"))),
    }
}

pub async fn root(State(state): State<Arc<AppState>>) -> Response {
    let index = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&index).await {
        Ok(html) => Html(html).into_response(),
        Err(_) => ok(
            "Stock Simulator API running. Visit /api/prices",
            json!({ "routes": ["/api/prices", "/api/portfolio"] }),
        ),
    }
}

pub async fn prices(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let sim = state.lock()?;
    Ok(ok(
        "prices returned",
        json!({ "date": sim.date().to_string(), "prices": sim.list_prices() }),
    ))
}

pub async fn next(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let fields = read_json(&body, false)?;
    let days = match fields.get("days") {
        Some(v) => integer_value(v),
        None => match query.get("days") {
            Some(raw) => integer_value(&Value::String(raw.clone())),
            None => Some(1),
        },
    }
    .ok_or_else(|| ApiError::bad_request("days must be an integer"))?;

    let date = state.lock()?.advance(days)?;
    Ok(ok(
        &format!("Advanced {days} day(s)"),
        json!({ "date": date.to_string() }),
    ))
}

pub async fn add_stock(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let fields = read_json(&body, true)?;
    let symbol = symbol_field(&fields)?;
    let price = optional_number(&fields, "price")?
        .ok_or_else(|| ApiError::bad_request("price must be a number"))?;
    let mu = optional_number(&fields, "mu")?.unwrap_or(DEFAULT_MU);
    let sigma = optional_number(&fields, "sigma")?.unwrap_or(DEFAULT_SIGMA);

    state.lock()?.add_instrument(&symbol, price, mu, sigma)?;
    Ok(respond(
        StatusCode::CREATED,
        "stock added",
        json!({ "symbol": symbol, "price": price, "mu": mu, "sigma": sigma }),
    ))
}

async fn trade(state: Arc<AppState>, side: Side, body: Bytes) -> Result<Response, ApiError> {
    let fields = read_json(&body, true)?;
    let order = Order {
        side,
        symbol: symbol_field(&fields)?,
        qty: qty_field(&fields)?,
        price: optional_number(&fields, "price")?,
    };

    let mut sim = state.lock()?;
    let executed = sim.execute(order)?;
    let summary = sim.summary();
    let message = match side {
        Side::Buy => "bought",
        Side::Sell => "sold",
    };
    Ok(ok(
        message,
        json!({
            "symbol": executed.symbol,
            "qty": executed.qty,
            "price": executed.price,
            "cash": summary.cash,
            "net_worth": summary.net_worth,
            "trades": sim.ledger().trades(),
            "prices": sim.list_prices(),
            "portfolio_summary": summary,
        }),
    ))
}

pub async fn buy(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    trade(state, Side::Buy, body).await
}

pub async fn sell(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    trade(state, Side::Sell, body).await
}

pub async fn portfolio(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let summary = state.lock()?.summary();
    Ok(ok("portfolio", json!(summary)))
}

pub async fn history(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let sim = state.lock()?;
    Ok(ok("history", json!({ "trades": sim.ledger().trades() })))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let stats = state.lock()?.stats();
    Ok(ok("stats", json!(stats)))
}

pub async fn price_history(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Response, ApiError> {
    let symbol = symbol.trim().to_uppercase();
    let points = state
        .lock()?
        .price_history(&symbol)
        .map_err(|_| ApiError::not_found("unknown symbol"))?;

    let dates: Vec<String> = points.iter().map(|p| p.date.to_string()).collect();
    let prices: Vec<f64> = points.iter().map(|p| p.price).collect();
    Ok(ok(
        "price history",
        json!({ "symbol": symbol, "dates": dates, "prices": prices }),
    ))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let backup = state.lock()?.reset()?;
    Ok(ok(
        "reset complete",
        json!({ "backup": backup.map(|p| p.display().to_string()) }),
    ))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
