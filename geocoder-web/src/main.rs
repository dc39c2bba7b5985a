//! Servidor web Axum para consultas ao geocoder, com WebSocket para
//! acompanhar a resolução passo a passo.
//!
//! Configuração por variáveis de ambiente:
//!
//! | Variável                  | Padrão                      |
//! |---------------------------|-----------------------------|
//! | `GEOCODER_INDEX`          | (nenhum) snapshot JSON      |
//! | `GEOCODER_GAZETTEER`      | `data/gazetteer.txt`        |
//! | `GEOCODER_THRESHOLDS`     | `data/population.threshold.txt` |
//! | `GEOCODER_ACTIVITY_SHARE` | `data/activity.share.txt`   |
//! | `GEOCODER_ADDR`           | `0.0.0.0:3000`              |
//! | `RUST_LOG`                | `info`                      |
//!
//! Com `GEOCODER_INDEX` definido, o índice é lido do snapshot e o gazetteer
//! é ignorado.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geocoder_core::{
    gazetteer::read_gazetteer, tokenizer::tokenize_with_offsets, ActivityShare, GeoIndex,
    Geocoder, IndexBuilder, Location, MatchedSpan, PopulationThresholds, Resolution, Token,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Estado compartilhado da aplicação
struct AppState {
    geocoder: Geocoder,
}

/// Caminhos e endereço lidos do ambiente.
#[derive(Debug, Clone)]
struct Config {
    index: Option<PathBuf>,
    gazetteer: PathBuf,
    thresholds: PathBuf,
    activity_share: PathBuf,
    addr: String,
}

impl Config {
    fn from_env() -> Self {
        let path = |key: &str, default: &str| {
            PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.to_string()))
        };
        Self {
            index: std::env::var("GEOCODER_INDEX").ok().map(PathBuf::from),
            gazetteer: path("GEOCODER_GAZETTEER", "data/gazetteer.txt"),
            thresholds: path("GEOCODER_THRESHOLDS", "data/population.threshold.txt"),
            activity_share: path("GEOCODER_ACTIVITY_SHARE", "data/activity.share.txt"),
            addr: std::env::var("GEOCODER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }

    /// Lê o snapshot ou constrói o índice a partir do gazetteer.
    fn load_index(&self) -> geocoder_core::Result<GeoIndex> {
        if let Some(snapshot) = &self.index {
            info!(path = %snapshot.display(), "carregando snapshot do índice");
            return GeoIndex::load(snapshot);
        }

        let thresholds =
            PopulationThresholds::from_reader(BufReader::new(File::open(&self.thresholds)?))?;
        let activity_share =
            ActivityShare::from_reader(BufReader::new(File::open(&self.activity_share)?))?;
        info!(path = %self.gazetteer.display(), "lendo gazetteer");
        let records = read_gazetteer(BufReader::new(File::open(&self.gazetteer)?), &thresholds)?;
        Ok(IndexBuilder::new(thresholds, activity_share).build(records))
    }
}

#[derive(Deserialize)]
struct ResolveQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
struct MatchRequest {
    text: String,
}

#[derive(Serialize)]
struct ResolveResponse<'a> {
    query: &'a str,
    location: Option<&'a Location>,
}

#[derive(Serialize)]
struct MatchResponse<'a> {
    tokens: Vec<Token>,
    spans: Vec<MatchedSpan<'a>>,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    let loader = config.clone();
    // Leitura do gazetteer é síncrona e pesada
    let index = tokio::task::spawn_blocking(move || loader.load_index()).await??;

    let state = Arc::new(AppState {
        geocoder: Geocoder::new(index),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/resolve", get(resolve_handler))
        .route("/explain", get(explain_handler))
        .route("/match", post(match_handler))
        .route("/health", get(health_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!("Geocoder iniciado em http://{}", config.addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn empty_query() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({"error": "Consulta vazia"})),
    )
        .into_response()
}

/// Resolve texto livre para uma entidade (ou `null`).
async fn resolve_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Response {
    if query.q.trim().is_empty() {
        return empty_query();
    }
    let location = state.geocoder.resolve(&query.q);
    Json(ResolveResponse {
        query: &query.q,
        location,
    })
    .into_response()
}

/// Todos os passos intermediários de uma resolução.
async fn explain_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResolveQuery>,
) -> Response {
    if query.q.trim().is_empty() {
        return empty_query();
    }
    Json(state.geocoder.explain(&query.q)).into_response()
}

/// Segmentação crua: spans casados e seus candidatos.
async fn match_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MatchRequest>,
) -> Response {
    let tokens = tokenize_with_offsets(&req.text);
    let keys: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
    let spans = state.geocoder.match_tokens(&keys);
    Json(MatchResponse { tokens, spans }).into_response()
}

/// Estatísticas do índice carregado
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index = state.geocoder.index();
    let categories: serde_json::Map<String, serde_json::Value> = index
        .category_counts()
        .into_iter()
        .map(|(category, count)| (category.geonames_name().to_string(), count.into()))
        .collect();
    Json(serde_json::json!({
        "status": "ok",
        "locations": index.len(),
        "keys": index.key_count(),
        "categories": categories,
        "overrides": state.geocoder.overrides().rules().len(),
    }))
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Eventos de uma resolução, na ordem em que acontecem.
fn resolution_events(resolution: &Resolution<'_>) -> Vec<serde_json::Value> {
    vec![
        serde_json::json!({"step": "tokens", "tokens": resolution.tokens}),
        serde_json::json!({"step": "spans", "spans": resolution.spans}),
        serde_json::json!({
            "step": "consistency",
            "consistent": resolution.consistent,
            "inconsistent": resolution.inconsistent,
        }),
        serde_json::json!({"step": "ranked", "ranked": resolution.ranked}),
        serde_json::json!({
            "step": "done",
            "overridden": resolution.overridden,
            "location": resolution.location,
        }),
    ]
}

/// Recebe texto e devolve os passos da resolução, um evento por mensagem
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                // Aceita {"text": ...} ou o texto puro
                let query = serde_json::from_str::<MatchRequest>(&text)
                    .map(|req| req.text)
                    .unwrap_or(text);
                if query.trim().is_empty() {
                    continue;
                }

                let events: Vec<String> = resolution_events(&state.geocoder.explain(&query))
                    .iter()
                    .filter_map(|event| match serde_json::to_string(event) {
                        Ok(json) => Some(json),
                        Err(err) => {
                            warn!(%err, "falha ao serializar evento");
                            None
                        }
                    })
                    .collect();

                for json in events {
                    if socket.send(Message::Text(json)).await.is_err() {
                        return; // cliente desconectou
                    }
                    // Pequena pausa para animação passo a passo
                    tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                }
            }
            Message::Close(_) => {
                info!("WebSocket desconectado");
                return;
            }
            Message::Ping(payload) => {
                let _ = socket.send(Message::Pong(payload)).await;
            }
            _ => {}
        }
    }
}
