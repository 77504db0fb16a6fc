//! Shared fixtures: a local websocket producer and a wired supervisor

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use logcrunch_adapters::{WsConfig, WsDialer};
use logcrunch_core::{ConnectionStatus, IdShape, LogBuffer, RecordDecoder};
use logcrunch_engine::{Supervisor, SupervisorConfig, SupervisorHandle};
use logcrunch_storage::KvStore;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tokio_util::sync::CancellationToken;

pub use logcrunch_storage::{FileStore, MemoryStore};

/// Bound on every wait in these specs
pub const WAIT: Duration = Duration::from_secs(5);

/// Local websocket server standing in for the log producer
pub struct Producer {
    url: String,
    connections: mpsc::UnboundedReceiver<ProducerConn>,
}

impl Producer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}/logs", listener.local_addr().unwrap());
        let (tx, connections) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let Ok(ws) = tokio_tungstenite::accept_async(tcp).await else {
                    continue;
                };
                if tx.send(ProducerConn { ws }).is_err() {
                    break;
                }
            }
        });

        Self { url, connections }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait for the next client to connect
    pub async fn accept(&mut self) -> ProducerConn {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("no client connected in time")
            .expect("producer stopped")
    }

    /// Whether a client connects within `within`
    pub async fn connects_within(&mut self, within: Duration) -> bool {
        matches!(
            tokio::time::timeout(within, self.connections.recv()).await,
            Ok(Some(_))
        )
    }
}

/// Producer side of one client connection
pub struct ProducerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ProducerConn {
    pub async fn send(&mut self, payload: impl Into<String>) {
        self.ws.send(Message::text(payload.into())).await.unwrap();
    }

    pub async fn send_binary(&mut self, payload: Vec<u8>) {
        self.ws.send(Message::binary(payload)).await.unwrap();
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Wait until the client closes or drops the connection
    pub async fn closed_by_client(&mut self) -> bool {
        let closed = async {
            loop {
                match self.ws.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => {}
                }
            }
        };
        tokio::time::timeout(WAIT, closed).await.is_ok()
    }
}

/// JSON record with an opaque identity
pub fn record(id: &str, message: &str) -> String {
    serde_json::json!({
        "id": id,
        "timestamp": 1700000000.0,
        "level": "info",
        "message": message,
    })
    .to_string()
}

/// JSON record with a structured identity and a span
pub fn structured_record(producer: &str, sequence: i64) -> String {
    serde_json::json!({
        "id": {"producer_id": producer, "sequence_number": sequence},
        "level": "debug",
        "message": "span",
        "function_call_started_at": 10.0,
        "function_call_ended_at": 12.0,
        "attrs": {"http": {"status": 200}},
    })
    .to_string()
}

/// Supervisor wired to a real websocket dialer, running in the background
pub struct Ingest<S: KvStore> {
    pub buffer: Arc<LogBuffer>,
    pub handle: SupervisorHandle<S>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl<S: KvStore> Ingest<S> {
    pub fn start(store: S, shape: IdShape, reconnect_delay: Duration) -> Self {
        Self::start_with(store, shape, reconnect_delay, WsConfig::default())
    }

    pub fn start_with(
        store: S,
        shape: IdShape,
        reconnect_delay: Duration,
        transport: WsConfig,
    ) -> Self {
        let buffer = Arc::new(LogBuffer::new());
        let supervisor = Supervisor::new(
            WsDialer::new(transport),
            store,
            Arc::clone(&buffer),
            RecordDecoder::new(shape),
            SupervisorConfig { reconnect_delay },
        );
        let handle = supervisor.handle();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(supervisor.run(shutdown.clone()));
        Self {
            buffer,
            handle,
            shutdown,
            task,
        }
    }

    pub async fn wait_for_status(&self, status: ConnectionStatus) {
        let handle = self.handle.clone();
        wait_until(&format!("status {status}"), move || handle.get_status() == status).await;
    }

    pub async fn wait_for_records(&self, count: usize) {
        let buffer = Arc::clone(&self.buffer);
        wait_until(&format!("{count} records"), move || buffer.len() >= count).await;
    }

    /// Shut the supervisor down and wait for it to finish
    pub async fn stop(self) -> Arc<LogBuffer> {
        self.shutdown.cancel();
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("supervisor did not stop")
            .unwrap();
        self.buffer
    }
}

pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !cond() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
