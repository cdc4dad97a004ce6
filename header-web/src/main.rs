//! Servidor web Axum com WebSocket para acompanhar a extração de cabeçalhos em tempo real

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use header_core::{
    demo::demo_documents,
    pipeline::{HeaderPipeline, PipelineEvent},
    Document, HeaderConfig, HeaderError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

/// Estado compartilhado da aplicação
struct AppState {
    pipeline: HeaderPipeline,
}

/// Mensagem WebSocket recebida do cliente: um documento ou o nome de uma demonstração
#[derive(Deserialize)]
#[serde(untagged)]
enum WsRequest {
    Demo { demo: String },
    Document(Box<Document>),
}

#[derive(Serialize)]
struct FeaturesResponse {
    feature_text: String,
    lines: usize,
}

#[derive(Serialize)]
struct TrainingResponse {
    markup: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match std::env::var("HEADER_CONFIG") {
        Ok(path) => {
            info!(%path, "carregando configuração");
            HeaderConfig::from_json_file(&path)?
        }
        Err(_) => HeaderConfig::default(),
    };
    let state = Arc::new(AppState {
        pipeline: HeaderPipeline::with_config(config),
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/demo", get(demo_handler))
        .route("/header", post(header_handler))
        .route("/features", post(features_handler))
        .route("/training", post(training_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .with_state(state);

    let addr = std::env::var("HEADER_WEB_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Servidor de cabeçalhos iniciado em http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// Falha de documento → 422 com o estágio que falhou
fn error_response(err: HeaderError) -> Response {
    warn!(error = %err, "documento abortado");
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(serde_json::json!({
            "error": err.to_string(),
            "stage": err.failed_stage(),
        })),
    )
        .into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

/// Documentos de demonstração prontos para enviar a `/header` ou `/ws`
async fn demo_handler() -> impl IntoResponse {
    let demos: Vec<serde_json::Value> = demo_documents()
        .into_iter()
        .map(|demo| {
            serde_json::json!({
                "name": demo.name,
                "description": demo.description,
                "document": demo.document,
            })
        })
        .collect();
    Json(demos)
}

/// Extração completa via HTTP POST (sem streaming)
async fn header_handler(
    State(state): State<Arc<AppState>>,
    Json(mut doc): Json<Document>,
) -> Response {
    match state.pipeline.process(&mut doc) {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

/// Texto de features da zona de cabeçalho
async fn features_handler(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<Document>,
) -> Response {
    let header = state.pipeline.features(&doc);
    Json(FeaturesResponse {
        lines: header.as_ref().map_or(0, |h| h.len()),
        feature_text: header.map(|h| h.feature_text).unwrap_or_default(),
    })
    .into_response()
}

/// Marcação de treinamento do cabeçalho rotulado
async fn training_handler(
    State(state): State<Arc<AppState>>,
    Json(doc): Json<Document>,
) -> Response {
    match state.pipeline.training(&doc) {
        Ok(markup) => Json(TrainingResponse { markup }).into_response(),
        Err(e) => error_response(e),
    }
}

/// Upgrade HTTP → WebSocket
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

/// Lógica do WebSocket: recebe um documento, executa o pipeline e envia os eventos
async fn handle_websocket(mut socket: WebSocket, state: Arc<AppState>) {
    info!("WebSocket conectado");

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let doc = match serde_json::from_str::<WsRequest>(&text) {
                    Ok(WsRequest::Document(doc)) => *doc,
                    Ok(WsRequest::Demo { demo }) => {
                        match demo_documents().into_iter().find(|d| d.name == demo) {
                            Some(found) => found.document,
                            None => {
                                warn!(%demo, "demonstração desconhecida");
                                continue;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "mensagem WebSocket inválida");
                        continue;
                    }
                };

                info!("Processando via WebSocket: {} tokens", doc.tokens.len());

                // O pipeline é síncrono: roda fora do runtime
                let (tx_std, rx_std) = std::sync::mpsc::channel::<PipelineEvent>();
                let state_for_thread = Arc::clone(&state);
                let handle = tokio::task::spawn_blocking(move || {
                    let mut doc = doc;
                    state_for_thread.pipeline.process_streaming(&mut doc, tx_std);
                });
                handle.await.ok();

                let events: Vec<PipelineEvent> = rx_std.try_iter().collect();
                for event in &events {
                    if let Ok(json) = serde_json::to_string(event) {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            return; // cliente desconectou
                        }
                        // Pequena pausa para animação visual (passo a passo)
                        tokio::time::sleep(tokio::time::Duration::from_millis(35)).await;
                    }
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
