//! Manages the primary WebSocket connection lifecycle for a coaching session.

use super::{
    cycle::handle_coach_cycle,
    protocol::{ClientMessage, ServerMessage},
};
use crate::{models::Turn, state::AppState};
use anyhow::{Result, anyhow};
use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use englishly_core::{
    Command,
    agent::{CoachSession, CoachService},
    report::report_key,
    stage::Stage,
};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use rmcp::ServiceExt;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tracing::{Instrument, error, info, instrument, warn};
use uuid::Uuid;

/// The fixed opening line, spoken before the first learner utterance.
const WELCOME_MESSAGE: &str = "Hello! I'm Englishly, your English coach. \
To get started, tell me a little about why you want to improve your English.";

/// Axum handler to upgrade an HTTP connection to a WebSocket.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Main handler for an individual WebSocket connection.
///
/// This function performs the initial handshake (the first frame must be an
/// `init` message), opens a fresh session at the greeting stage, speaks the
/// welcome line, and then spawns the session loop.
#[instrument(name = "ws_session", skip_all, fields(session_id))]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let temp_id: u32 = rand::random();
    tracing::Span::current().record("session_id", temp_id.to_string());
    info!("New WebSocket connection. Awaiting initialization...");

    let (socket_tx, mut socket_rx) = socket.split();
    let socket_tx_arc = Arc::new(Mutex::new(socket_tx));

    // The first message from the client must be an `init` message.
    match await_init(&mut socket_rx).await {
        Ok(()) => {}
        Err(e) => {
            error!("Session initialization failed: {:?}", e);
            let mut sink = socket_tx_arc.lock().await;
            let _ = send_msg(
                &mut sink,
                ServerMessage::Error {
                    message: e.to_string(),
                },
            )
            .await;
            return;
        }
    }

    let session_id = Uuid::new_v4();
    tracing::Span::current().record("session_id", session_id.to_string());

    // Confirm the session and speak the fixed welcome line.
    {
        let mut sink = socket_tx_arc.lock().await;
        if send_msg(
            &mut sink,
            ServerMessage::Initialized {
                session_id,
                stage: Stage::Greeting,
            },
        )
        .await
        .is_err()
        {
            error!("Failed to send Initialized message to client.");
            return;
        }
        if speak(&mut sink, WELCOME_MESSAGE).await.is_err() {
            error!("Failed to send welcome message to client.");
            return;
        }
    }

    // Spawn the main session loop in a separate, instrumented task.
    let session_span = tracing::info_span!("coach_runtime", %session_id);
    tokio::spawn(
        async move {
            if let Err(e) =
                run_coach_session(state, socket_tx_arc.clone(), socket_rx, session_id).await
            {
                error!(error = ?e, "Coaching session terminated with error.");
                let mut sink = socket_tx_arc.lock().await;
                let _ = send_msg(
                    &mut sink,
                    ServerMessage::Error {
                        message: e.to_string(),
                    },
                )
                .await;
            }
            info!("Coaching session finished.");
        }
        .instrument(session_span),
    );
}

/// Reads the handshake frame and verifies it is an `init` message.
async fn await_init(socket_rx: &mut SplitStream<WebSocket>) -> Result<()> {
    let Some(Ok(ws_msg)) = socket_rx.next().await else {
        return Err(anyhow!("Client disconnected before sending init message."));
    };
    let Message::Text(text) = ws_msg else {
        return Err(anyhow!("First message was not a text `init` message."));
    };
    match serde_json::from_str::<ClientMessage>(&text)? {
        ClientMessage::Init => Ok(()),
        _ => Err(anyhow!("First message must be `init`")),
    }
}

/// The main event loop for an active coaching session.
///
/// This function listens for learner utterances from the host runtime and
/// for stage updates from the session's tool service, and drives one
/// reason/act cycle per utterance until the session concludes or the
/// connection closes.
async fn run_coach_session(
    state: Arc<AppState>,
    socket_tx: Arc<Mutex<SplitSink<WebSocket, Message>>>,
    mut socket_rx: SplitStream<WebSocket>,
    session_id: Uuid,
) -> Result<()> {
    let session_arc = Arc::new(tokio::sync::Mutex::new(CoachSession::new()));
    let (state_update_tx, mut state_update_rx) = mpsc::channel(8);
    let coach_service = CoachService::new(
        session_arc.clone(),
        Some(state_update_tx),
        state.report_store.clone(),
        session_id.to_string(),
    );
    let (server_transport, client_transport) = tokio::io::duplex(4096);

    // Spawn the session's tool-handling service.
    let coach_tool_handle = tokio::spawn(async move {
        if let Ok(service) = coach_service.serve(server_transport).await {
            let _ = service.waiting().await;
        }
    });
    let mcp_client = ().serve(client_transport).await?;

    let mut history: Vec<Turn> = Vec::new();

    loop {
        tokio::select! {
            // Handle messages from the host runtime.
            Some(msg_result) = socket_rx.next() => {
                match msg_result {
                    Ok(ws_msg) => match ws_msg {
                        Message::Text(text) => {
                            match serde_json::from_str::<ClientMessage>(&text) {
                                Ok(ClientMessage::UserMessage { text }) => {
                                    let command = handle_coach_cycle(
                                        &state,
                                        &mut history,
                                        &session_arc,
                                        &mcp_client,
                                        &text,
                                        &socket_tx,
                                    )
                                    .await?;
                                    if let Command::SessionComplete(_) = command {
                                        let key = report_key(&session_id.to_string());
                                        send_msg(
                                            &mut *socket_tx.lock().await,
                                            ServerMessage::SessionEnded { report_key: key },
                                        )
                                        .await?;
                                        info!("Session concluded. Closing connection.");
                                        break;
                                    }
                                }
                                Ok(_) => warn!("Ignoring unexpected text message post-init."),
                                Err(_) => warn!("Ignoring unparseable client message."),
                            }
                        },
                        Message::Binary(_) => {
                            warn!("Ignoring binary frame; audio belongs to the host runtime.");
                        },
                        Message::Close(_) => {
                            info!("Client sent close frame. Shutting down session.");
                            break;
                        },
                        Message::Ping(_) | Message::Pong(_) => {},
                    },
                    Err(e) => {
                        error!("Error receiving from client WebSocket: {:?}", e);
                        break;
                    }
                }
            },
            // Forward stage updates from the session's tool service.
            Some(new_state) = state_update_rx.recv() => {
                send_msg(
                    &mut *socket_tx.lock().await,
                    ServerMessage::StageAdvanced { stage: new_state.stage },
                )
                .await?;
            },
            // If all channels close, exit the loop.
            else => break,
        }
    }

    // Clean up the tool service task on exit.
    coach_tool_handle.abort();
    info!("WebSocket connection closed and coaching session terminated.");
    Ok(())
}

/// A helper function to serialize and send a `ServerMessage` to the client.
pub(crate) async fn send_msg(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    msg: ServerMessage,
) -> Result<()> {
    let serialized = serde_json::to_string(&msg)?;
    socket_tx.send(Message::Text(serialized.into())).await?;
    Ok(())
}

/// Sends one complete coach response as a start/chunk/end frame triplet.
pub(crate) async fn speak(
    socket_tx: &mut SplitSink<WebSocket, Message>,
    text: &str,
) -> Result<()> {
    send_msg(socket_tx, ServerMessage::ResponseStart).await?;
    send_msg(
        socket_tx,
        ServerMessage::ResponseChunk {
            chunk: text.to_string(),
        },
    )
    .await?;
    send_msg(socket_tx, ServerMessage::ResponseEnd).await?;
    Ok(())
}
