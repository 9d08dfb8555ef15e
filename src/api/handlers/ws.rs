// src/api/handlers/ws.rs
use actix::{Actor, StreamHandler, Handler, Message, Addr, AsyncContext};
use actix_web::{web, HttpRequest, HttpResponse, Error};
use actix_web_actors::ws;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use crate::api::AppState;
use crate::controller::{JobSnapshot, LifecycleEvent};

#[derive(Message, Clone, Serialize)]
#[rtype(result = "()")]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    #[serde(flatten)]
    pub event: LifecycleEvent,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct WsBroker {
    clients: Arc<RwLock<Vec<Addr<WsConnection>>>>,
}

impl Default for WsBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl WsBroker {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn register(&self, addr: Addr<WsConnection>) {
        let mut clients = self.clients.write().await;
        clients.push(addr);
    }

    pub async fn unregister(&self, addr: &Addr<WsConnection>) {
        let mut clients = self.clients.write().await;
        clients.retain(|c| c != addr);
    }

    pub async fn broadcast(&self, msg: JobUpdate) {
        let clients = self.clients.read().await;
        for client in clients.iter() {
            client.do_send(msg.clone());
        }
    }

    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }
}

/// Relays controller events to every connected browser until the
/// controller's channel closes.
pub async fn forward_events(mut events: broadcast::Receiver<LifecycleEvent>, broker: WsBroker) {
    loop {
        match events.recv().await {
            Ok(event) => {
                broker.broadcast(JobUpdate { event, sent_at: Utc::now() }).await;
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("WebSocket relay skipped {} lifecycle events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub struct WsConnection {
    broker: WsBroker,
    /// Sent once on connect so a fresh page can render without polling.
    initial: Option<String>,
}

impl WsConnection {
    pub fn new(broker: WsBroker, snapshot: &JobSnapshot) -> Self {
        let initial = serde_json::to_string(&serde_json::json!({
            "event": "snapshot",
            "snapshot": snapshot,
        }))
        .ok();
        Self { broker, initial }
    }
}

impl Actor for WsConnection {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        if let Some(initial) = self.initial.take() {
            ctx.text(initial);
        }
        let addr = ctx.address();
        let broker = self.broker.clone();
        actix::spawn(async move {
            broker.register(addr).await;
        });
    }

    fn stopped(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let broker = self.broker.clone();
        actix::spawn(async move {
            broker.unregister(&addr).await;
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsConnection {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(reason)) => ctx.close(reason),
            _ => (),
        }
    }
}

impl Handler<JobUpdate> for WsConnection {
    type Result = ();

    fn handle(&mut self, msg: JobUpdate, ctx: &mut Self::Context) {
        if let Ok(json) = serde_json::to_string(&msg) {
            ctx.text(json);
        }
    }
}

pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    broker: web::Data<WsBroker>,
) -> Result<HttpResponse, Error> {
    let conn = WsConnection::new(broker.get_ref().clone(), &state.controller.snapshot());
    ws::start(conn, &req, stream)
}
