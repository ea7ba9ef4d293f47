use actix::{
    Actor, ActorContext, ActorFutureExt, AsyncContext, Handler, Message as ActixMessage,
    Recipient, StreamHandler, WrapFuture,
};
use actix_web::{get, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::middleware::guards::User;
use crate::state::AppState;
use crate::websocket::events::WebSocketEvent;
use crate::websocket::message_types::{InboundFrame, WsInboundEvent, WsOutboundEvent};
use crate::websocket::{ConnectionId, Endpoint, EndpointError};

/// Pushes a session may have queued before the hub gives up on it.
const SESSION_MAILBOX_CAPACITY: usize = 256;

/// Serialized event pushed by the hub.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Push(pub String);

/// Asks the session to close, e.g. when it is replaced or on shutdown.
#[derive(ActixMessage)]
#[rtype(result = "()")]
pub struct Close;

/// Hub endpoint backed by a session actor's mailbox.
pub struct SessionEndpoint {
    push: Recipient<Push>,
    close: Recipient<Close>,
}

impl SessionEndpoint {
    pub fn new(push: Recipient<Push>, close: Recipient<Close>) -> Self {
        Self { push, close }
    }
}

impl Endpoint for SessionEndpoint {
    fn send(&self, payload: String) -> Result<(), EndpointError> {
        self.push.try_send(Push(payload)).map_err(|e| match e {
            actix::prelude::SendError::Full(_) => EndpointError::Full,
            actix::prelude::SendError::Closed(_) => EndpointError::Closed,
        })
    }

    fn close(&self) {
        self.close.do_send(Close);
    }
}

struct WsSession {
    user_id: Uuid,
    connection_id: Option<ConnectionId>,
    state: AppState,
    hb: Instant,
}

impl WsSession {
    fn new(user_id: Uuid, state: AppState) -> Self {
        Self {
            user_id,
            connection_id: None,
            state,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let ping_interval = self.state.config.ws.ping_interval;
        let client_timeout = self.state.config.ws.client_timeout;

        ctx.run_interval(ping_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > client_timeout {
                tracing::warn!(user_id = %act.user_id, "websocket heartbeat timed out");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn reply(&self, ctx: &mut ws::WebsocketContext<Self>, event: &WsOutboundEvent) {
        match serde_json::to_string(event) {
            Ok(text) => ctx.text(text),
            Err(e) => tracing::error!(error = %e, "failed to encode reply"),
        }
    }

    fn handle_event(&self, event: WsInboundEvent, ctx: &mut ws::WebsocketContext<Self>) {
        match event {
            WsInboundEvent::Ping => self.reply(ctx, &WsOutboundEvent::Pong),
            WsInboundEvent::Typing { conversation_id } => {
                let delivery = self.state.delivery.clone();
                let user_id = self.user_id;
                actix::spawn(async move {
                    delivery
                        .deliver(conversation_id, user_id, WebSocketEvent::TypingStarted {}, true)
                        .await;
                });
            }
        }
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        ctx.set_mailbox_capacity(SESSION_MAILBOX_CAPACITY);
        let endpoint = Arc::new(SessionEndpoint::new(
            ctx.address().recipient(),
            ctx.address().recipient(),
        ));
        let registry = self.state.registry.clone();
        let user_id = self.user_id;

        // Hold the mailbox until the registration is in place.
        ctx.wait(
            async move { registry.join(user_id, endpoint).await }
                .into_actor(self)
                .map(|connection_id, act, _ctx| {
                    act.connection_id = Some(connection_id);
                }),
        );

        self.hb(ctx);
        tracing::info!(user_id = %self.user_id, "websocket session started");
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "websocket session stopped");

        if let Some(connection_id) = self.connection_id.take() {
            let registry = self.state.registry.clone();
            let user_id = self.user_id;
            actix::spawn(async move {
                registry.release(user_id, connection_id).await;
            });
        }
    }
}

impl Handler<Push> for WsSession {
    type Result = ();

    fn handle(&mut self, msg: Push, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl Handler<Close> for WsSession {
    type Result = ();

    fn handle(&mut self, _msg: Close, ctx: &mut Self::Context) {
        ctx.close(None);
        ctx.stop();
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        let msg = match msg {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, error = %e, "websocket protocol error");
                ctx.stop();
                return;
            }
        };
        self.hb = Instant::now();

        match msg {
            ws::Message::Ping(payload) => ctx.pong(&payload),
            ws::Message::Pong(_) => {}
            ws::Message::Text(text) => match InboundFrame::parse(&text) {
                InboundFrame::Event(event) => self.handle_event(event, ctx),
                InboundFrame::Unhandled(action) => {
                    tracing::debug!(user_id = %self.user_id, action = %action, "unknown websocket action");
                }
                InboundFrame::NoAction => {
                    tracing::debug!(user_id = %self.user_id, "websocket frame without action");
                }
                InboundFrame::Malformed(e) => {
                    tracing::warn!(user_id = %self.user_id, error = %e, "malformed websocket frame");
                    self.reply(ctx, &WsOutboundEvent::malformed(&e));
                }
            },
            ws::Message::Binary(_) => {
                tracing::warn!(user_id = %self.user_id, "binary websocket frames are not supported");
            }
            ws::Message::Close(reason) => {
                tracing::debug!(user_id = %self.user_id, ?reason, "websocket closed by client");
                ctx.close(reason);
                ctx.stop();
            }
            ws::Message::Continuation(_) | ws::Message::Nop => {}
        }
    }
}

/// GET /api/v1/user/ws
#[get("/ws")]
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    user: User,
) -> Result<HttpResponse, Error> {
    let session = WsSession::new(user.id, state.get_ref().clone());
    ws::start(session, &req, stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::{ConnectionRegistry, SendOutcome};
    use actix::Context;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Sink {
        received: Arc<Mutex<Vec<String>>>,
    }

    impl Actor for Sink {
        type Context = Context<Self>;
    }

    impl Handler<Push> for Sink {
        type Result = ();

        fn handle(&mut self, msg: Push, _ctx: &mut Self::Context) {
            self.received.lock().unwrap().push(msg.0);
        }
    }

    impl Handler<Close> for Sink {
        type Result = ();

        fn handle(&mut self, _msg: Close, ctx: &mut Self::Context) {
            ctx.stop();
        }
    }

    #[actix_rt::test]
    async fn test_endpoint_delivers_then_reports_closed() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let addr = Sink {
            received: received.clone(),
        }
        .start();
        let endpoint = SessionEndpoint::new(addr.clone().recipient(), addr.clone().recipient());

        endpoint.send("hello".into()).unwrap();
        endpoint.close();

        for _ in 0..50 {
            if !addr.connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(*received.lock().unwrap(), vec!["hello".to_string()]);
        assert_eq!(endpoint.send("late".into()), Err(EndpointError::Closed));
    }

    #[actix_rt::test]
    async fn test_overflowing_session_is_evicted_and_closed() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let addr = Sink {
            received: received.clone(),
        }
        .start();
        let registry = ConnectionRegistry::new();
        let user = Uuid::now_v7();
        registry
            .join(
                user,
                Arc::new(SessionEndpoint::new(
                    addr.clone().recipient(),
                    addr.clone().recipient(),
                )),
            )
            .await;

        // The sink cannot drain while this task holds the thread.
        let mut outcomes = Vec::new();
        for i in 0..64 {
            outcomes.push(registry.send_to_user(user, format!("m{i}")).await);
        }
        let delivered = outcomes
            .iter()
            .filter(|o| **o == SendOutcome::Delivered)
            .count();
        assert!(outcomes.contains(&SendOutcome::Evicted));
        assert!(!registry.is_online(user).await);

        for _ in 0..50 {
            if !addr.connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!addr.connected(), "evicted session must be closed");
        assert_eq!(received.lock().unwrap().len(), delivered);
    }
}
