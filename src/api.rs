use anyhow::{Context, Result};
use axum::{
    extract::State,
    response::Html,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::services::ServeDir;
use tracing::info;

use crate::models::{SharedSnapshot, StatusSnapshot};

pub async fn get_data(State(snapshot): State<SharedSnapshot>) -> Json<StatusSnapshot> {
    let snapshot = snapshot.read().await;
    Json(snapshot.clone())
}

pub async fn dashboard() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub fn create_router(snapshot: SharedSnapshot, image_dir: &Path) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/api/data", get(get_data))
        .nest_service("/image", ServeDir::new(image_dir))
        .with_state(snapshot)
}

pub async fn start_server(port: u16, snapshot: SharedSnapshot, image_dir: &Path) -> Result<()> {
    let app = create_router(snapshot, image_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind status port {}", port))?;
    info!("Dashboard: http://localhost:{}", addr.port());
    axum::serve(listener, app).await.context("Status server stopped")?;
    Ok(())
}

const INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width,initial-scale=1" />
<title>Soil Moisture Monitor</title>
<style>
  body { font: 16px/1.5 system-ui, sans-serif; margin: 0; padding: 20px; background:#f8f9fa; color:#333; }
  .container { max-width: 760px; margin: 0 auto; background:#fff; border-radius:8px; box-shadow:0 2px 10px #0001; overflow:hidden; }
  .header { background:#2c3e50; color:#fff; padding:24px; text-align:center; }
  .header h1 { margin:0; font-size:26px; font-weight:600; }
  .content { padding:24px; }
  .grid { display:grid; gap:12px; grid-template-columns: repeat(auto-fit, minmax(180px,1fr)); }
  .card { border-radius:8px; padding:16px; text-align:center; border:1px solid #e5e7eb; }
  .kpi { font-size:30px; font-weight:700; }
  .label { font-size:13px; opacity:.7; }
  .mood { margin-top:16px; padding:16px; border-radius:8px; background:#fdf2f8; text-align:center; }
  .face { font-size:48px; }
  .bar { height:14px; background:#e5e7eb; border-radius:7px; overflow:hidden; margin:16px 0; }
  .fill { height:100%; width:0; transition: width .4s; }
  .status-low .fill, .status-low.card { background:#fdecea; }
  .status-low .fill { background:#e74c3c; }
  .status-moderate .fill { background:#f1c40f; }
  .status-moderate.card { background:#fef9e7; }
  .status-sufficient .fill { background:#2ecc71; }
  .status-sufficient.card { background:#eafaf1; }
  pre { white-space:pre-wrap; font:inherit; margin:0; }
  .footer { padding:12px 24px; font-size:13px; opacity:.7; border-top:1px solid #eee; }
  button { font-size:15px; padding:8px 14px; border-radius:6px; border:0; background:#2c3e50; color:#fff; cursor:pointer; }
</style>
<div class="container">
  <div class="header"><h1>Soil Moisture Monitor</h1></div>
  <div class="content">
    <div class="grid">
      <div id="card-pct" class="card"><div id="percentage" class="kpi">–</div><div class="label">Moisture (%)</div></div>
      <div id="card-raw" class="card"><div id="raw" class="kpi">–</div><div class="label">Sensor value</div></div>
      <div id="card-status" class="card"><div id="status" class="kpi">–</div><div class="label">Status</div></div>
    </div>
    <div id="bar" class="bar"><div class="fill" id="fill"></div></div>
    <pre id="message">Starting up...</pre>
    <div class="mood">
      <div id="face" class="face">🙂</div>
      <div id="caption">…</div>
    </div>
    <p><button id="refresh">Refresh</button></p>
  </div>
  <div class="footer">Last update: <span id="updated">never</span></div>
</div>
<script>
const LABELS = { low: 'Low', moderate: 'Moderate', sufficient: 'Sufficient' };
const FACES = { sad: '😢', normal: '🙂', happy: '😄' };
function setStatusClass(el, status) {
  el.classList.remove('status-low', 'status-moderate', 'status-sufficient');
  if (status) el.classList.add('status-' + status);
}
async function refresh() {
  try {
    const r = await fetch('/api/data');
    const d = await r.json();
    document.getElementById('percentage').textContent = d.percentage;
    document.getElementById('raw').textContent = d.raw_value;
    document.getElementById('status').textContent = LABELS[d.status] || 'Unknown';
    document.getElementById('message').textContent = d.message;
    document.getElementById('caption').textContent = d.character_message;
    document.getElementById('face').textContent = FACES[d.character_face] || FACES.normal;
    document.getElementById('fill').style.width = Math.max(0, Math.min(100, d.percentage)) + '%';
    document.getElementById('updated').textContent = d.last_update ? new Date(d.last_update).toLocaleString() : 'never';
    for (const id of ['card-pct', 'card-raw', 'card-status', 'bar']) {
      setStatusClass(document.getElementById(id), d.status);
    }
  } catch (e) {
    console.log(e);
  }
}
document.getElementById('refresh').addEventListener('click', refresh);
refresh();
setInterval(refresh, 15000);
</script>
</html>
"#;
