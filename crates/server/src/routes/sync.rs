//! The synchronization trigger endpoint and its minimal form front-end.

use axum::response::Html;
use axum::{Form, Json, extract::State};
use serde::Deserialize;

use order_tagger_core::DateWindow;

use crate::error::{AppError, Result};
use crate::state::AppState;
use crate::sync::SyncReport;

/// Minimal trigger form. Deliberately unstyled - this is an operator
/// tool, not a storefront page.
const FORM_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Order Tagger</title></head>
<body>
  <h1>Order Tagger</h1>
  <p>Recompute order sequence tags for every order in a date window.</p>
  <form method="post" action="/sync">
    <label>From <input type="date" name="from_date" required></label>
    <label>To <input type="date" name="to_date" required></label>
    <button type="submit">Run sync</button>
  </form>
</body>
</html>
"#;

/// Trigger parameters; both dates are required but arrive optional so
/// the handler can return a proper 400 instead of a deserialization
/// rejection.
#[derive(Debug, Deserialize)]
pub struct SyncParams {
    #[serde(default)]
    from_date: Option<String>,
    #[serde(default)]
    to_date: Option<String>,
}

/// Serve the trigger form.
pub async fn form() -> Html<&'static str> {
    Html(FORM_PAGE)
}

/// Run one synchronization pass and report the outcome.
///
/// Missing or malformed dates are rejected before any remote call is
/// made. A fatal run error maps to 502; per-order failures are carried
/// inside the report of a successful response.
pub async fn trigger(
    State(state): State<AppState>,
    Form(params): Form<SyncParams>,
) -> Result<Json<SyncReport>> {
    let from = require_date(params.from_date, "from_date")?;
    let to = require_date(params.to_date, "to_date")?;

    let window =
        DateWindow::parse(&from, &to).map_err(|err| AppError::BadRequest(err.to_string()))?;

    let report = state.sequencer().run(&window).await?;
    Ok(Json(report))
}

fn require_date(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required field: {field}")))
}
