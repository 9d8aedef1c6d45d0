//! TCP protocol server: accept loop and per-connection handler.
//!
//! Each connection has one reader loop and one writer task. Every request
//! runs on its own spawned task; responses go back through the writer as
//! they complete, so replies may arrive out of order and are correlated by
//! `call_id`. A call whose connection has gone away still runs to
//! completion; its result is dropped and its session released as usual.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::ipc::codec::{
    encode_msgpack, read_frame, write_frame, Frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE,
};
use crate::ipc::protocol::decode_request;
use crate::ipc::router::route_request;
use crate::tools::Dispatcher;
use crate::types::{CallId, Error, IpcConfig, ToolCallResult};

/// Outbound frames queued per connection before readers back off.
const OUTBOUND_QUEUE: usize = 64;

/// Protocol server fronting the dispatcher.
#[derive(Debug)]
pub struct ProtocolServer {
    dispatcher: Dispatcher,
    addr: SocketAddr,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
}

impl ProtocolServer {
    pub fn new(dispatcher: Dispatcher, addr: SocketAddr, ipc_config: IpcConfig) -> Self {
        Self {
            dispatcher,
            addr,
            cancel: CancellationToken::new(),
            ipc_config,
        }
    }

    /// Bind the configured address and serve until cancelled.
    pub async fn serve(&self) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener until cancelled.
    pub async fn serve_on(&self, listener: TcpListener) -> std::io::Result<()> {
        let conn_semaphore = Arc::new(Semaphore::new(self.ipc_config.max_connections));
        tracing::info!(
            addr = %listener.local_addr()?,
            max_connections = self.ipc_config.max_connections,
            "protocol server listening"
        );

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    tracing::info!("protocol server shutting down");
                    break;
                }
                accept = listener.accept() => {
                    let (stream, peer) = accept?;

                    let permit = match conn_semaphore.clone().try_acquire_owned() {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::warn!(
                                peer = %peer,
                                max_connections = self.ipc_config.max_connections,
                                "connection rejected: at max_connections"
                            );
                            drop(stream);
                            continue;
                        }
                    };

                    tracing::debug!(
                        peer = %peer,
                        active = self.ipc_config.max_connections - conn_semaphore.available_permits(),
                        "connection accepted"
                    );
                    let dispatcher = self.dispatcher.clone();
                    let cancel = self.cancel.clone();
                    let ipc_config = self.ipc_config.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, dispatcher, cancel, ipc_config, permit).await {
                            tracing::warn!(peer = %peer, error = %e, "connection error");
                        }
                    });
                }
            }
        }
        Ok(())
    }

    /// Request graceful shutdown.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Token cancelled by [`shutdown`](Self::shutdown).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Read frames, spawn one task per request, funnel responses to the writer.
async fn handle_connection(
    stream: TcpStream,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
    ipc_config: IpcConfig,
    _permit: OwnedSemaphorePermit, // held for connection lifetime
) -> std::io::Result<()> {
    let (mut reader, writer) = stream.into_split();
    let (tx, rx) = mpsc::channel::<(u8, Vec<u8>)>(OUTBOUND_QUEUE);
    let writer_task = tokio::spawn(write_loop(writer, rx, ipc_config.write_timeout));

    let outcome = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break Ok(()),
            frame = tokio::time::timeout(
                ipc_config.read_timeout,
                read_frame(&mut reader, ipc_config.max_frame_bytes),
            ) => frame,
        };

        let (msg_type, payload) = match frame {
            Err(_elapsed) => {
                tracing::debug!(
                    timeout_ms = ipc_config.read_timeout.as_millis() as u64,
                    "read timeout, dropping connection"
                );
                break Ok(());
            }
            Ok(Err(e)) => break Err(e),
            Ok(Ok(None)) => break Ok(()),
            Ok(Ok(Some(Frame::Rejected(reason)))) => {
                tracing::debug!(reason = %reason, "frame rejected");
                let response = ToolCallResult::failure(CallId::from(""), &Error::malformed_request(reason));
                if !enqueue(&tx, MSG_ERROR, &response).await {
                    break Ok(());
                }
                continue;
            }
            Ok(Ok(Some(Frame::Message(msg_type, payload)))) => (msg_type, payload),
        };

        if msg_type != MSG_REQUEST {
            let err = Error::malformed_request(format!("unexpected message type: 0x{:02X}", msg_type));
            let response = ToolCallResult::failure(CallId::from(""), &err);
            if !enqueue(&tx, MSG_ERROR, &response).await {
                break Ok(());
            }
            continue;
        }

        let request = match decode_request(&payload) {
            Ok(request) => request,
            Err(failure) => {
                tracing::debug!(error = %failure.error, "malformed request");
                if !enqueue(&tx, MSG_ERROR, &failure.into_result()).await {
                    break Ok(());
                }
                continue;
            }
        };

        let dispatcher = dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = route_request(&dispatcher, request).await;
            if !enqueue(&tx, MSG_RESPONSE, &response).await {
                tracing::debug!(call_id = %response.call_id, "connection closed, response discarded");
            }
        });
    };

    // The writer drains once every in-flight call has sent or dropped its sender.
    drop(tx);
    match writer_task.await {
        Ok(Err(e)) => tracing::debug!(error = %e, "writer stopped"),
        Err(e) => tracing::warn!(error = %e, "writer task failed"),
        Ok(Ok(())) => {}
    }
    outcome
}

/// Encode and queue a response. Returns false once the writer is gone.
async fn enqueue(tx: &mpsc::Sender<(u8, Vec<u8>)>, msg_type: u8, response: &ToolCallResult) -> bool {
    match encode_or_internal(response, encode_msgpack(response)) {
        Ok(encoded) => tx.send((msg_type, encoded)).await.is_ok(),
        Err(e) => {
            tracing::error!(call_id = %response.call_id, error = %e, "response dropped, fallback encoding failed");
            true
        }
    }
}

/// Keep the caller's `call_id` answered when its response cannot be encoded.
fn encode_or_internal(
    response: &ToolCallResult,
    encoded: std::io::Result<Vec<u8>>,
) -> std::io::Result<Vec<u8>> {
    match encoded {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            let err = Error::internal(format!("response could not be encoded: {}", e));
            encode_msgpack(&ToolCallResult::failure(response.call_id.clone(), &err))
        }
    }
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::Receiver<(u8, Vec<u8>)>,
    write_timeout: Duration,
) -> std::io::Result<()> {
    while let Some((msg_type, payload)) = rx.recv().await {
        timed_write(&mut writer, msg_type, &payload, write_timeout).await?;
    }
    Ok(())
}

/// Write a frame with a timeout. Slow consumers are dropped.
async fn timed_write<W: tokio::io::AsyncWriteExt + Unpin>(
    writer: &mut W,
    msg_type: u8,
    payload: &[u8],
    timeout: Duration,
) -> std::io::Result<()> {
    tokio::time::timeout(timeout, write_frame(writer, msg_type, payload))
        .await
        .map_err(|_| {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "write timeout, dropping connection");
            std::io::Error::new(std::io::ErrorKind::TimedOut, "write timeout")
        })?
}
