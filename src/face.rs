use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::response::Html;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::launcher::{RunEvent, RunHandle, RunLauncher};

impl RunEvent {
    fn name(&self) -> &'static str {
        match self {
            RunEvent::Launched { .. } => "launched",
            RunEvent::Step { .. } => "step",
            RunEvent::Finished { .. } => "finished",
            RunEvent::Faulted { .. } => "faulted",
        }
    }

    fn to_sse_event(&self) -> Event {
        let data = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        Event::default().event(self.name()).data(data)
    }
}

#[derive(Serialize)]
struct StartResponse {
    message: &'static str,
    #[serde(flatten)]
    run: RunHandle,
}

pub fn router(launcher: RunLauncher) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/start", post(start_handler))
        .route("/events", get(sse_handler))
        .route(
            "/favicon.ico",
            get(|| async { axum::http::StatusCode::NO_CONTENT }),
        )
        .with_state(launcher)
}

/// Serve on `host`, trying `port` and the nine ports after it.
pub async fn serve(launcher: RunLauncher, host: &str, port: u16) -> anyhow::Result<()> {
    let mut listener = None;
    for p in port..port.saturating_add(10) {
        match tokio::net::TcpListener::bind((host, p)).await {
            Ok(l) => {
                listener = Some(l);
                break;
            }
            Err(e) => warn!(port = p, error = %e, "port unavailable"),
        }
    }
    let listener = listener.ok_or_else(|| {
        anyhow::anyhow!("could not bind to any port {}-{}", port, port.saturating_add(9))
    })?;

    info!("web front door at http://{}", listener.local_addr()?);
    axum::serve(listener, router(launcher)).await?;
    Ok(())
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn start_handler(State(launcher): State<RunLauncher>) -> Json<StartResponse> {
    let run = launcher.start_run();
    info!(run_id = %run.id, "POST /start");
    Json(StartResponse {
        message: "Nova started successfully!",
        run,
    })
}

async fn sse_handler(
    State(launcher): State<RunLauncher>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = launcher.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok::<_, Infallible>(event.to_sse_event())),
        Err(_) => None,
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>NovaCab</title>
<style>
  body { background: #0a0a0f; color: #e0e0e0; font-family: system-ui, sans-serif; margin: 0; padding: 32px; }
  button { background: #6366f1; color: #fff; border: 0; border-radius: 8px; padding: 10px 20px; font-size: 15px; cursor: pointer; }
  #log { margin-top: 20px; font-family: monospace; font-size: 13px; }
  .finished { color: #86efac; }
  .faulted { color: #fca5a5; }
</style>
</head>
<body>
<h1>NovaCab</h1>
<button id="start">Start Nova</button>
<div id="log"></div>
<script>
  const log = document.getElementById('log');
  function add(cls, text) {
    const div = document.createElement('div');
    div.className = cls;
    div.textContent = text;
    log.appendChild(div);
  }
  document.getElementById('start').onclick = async () => {
    const res = await fetch('/start', { method: 'POST' });
    const body = await res.json();
    add('launched', body.message + ' (' + body.id + ')');
  };
  const es = new EventSource('/events');
  es.addEventListener('step', e => { const d = JSON.parse(e.data); add('step', d.from + ' -> ' + d.to); });
  es.addEventListener('finished', e => { const d = JSON.parse(e.data); add('finished', 'finished: ' + d.final_step); });
  es.addEventListener('faulted', e => { const d = JSON.parse(e.data); add('faulted', 'fault: ' + d.message); });
</script>
</body>
</html>
"##;
