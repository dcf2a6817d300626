//! Accept loop and per-connection lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use geoquiz_protocol::ServerMessage;
use geoquiz_room::{
    AccountStore, ClientId, CommandOutcome, Hub, JoinRequest, RejectReason, CLIENT_QUEUE_SIZE,
};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

use crate::params::ConnectParams;
use crate::pump::{read_pump, send_direct, write_pump, WsSink};
use crate::ServerError;

pub struct GeoquizServer<A: AccountStore> {
    listener: TcpListener,
    hub: Arc<Hub<A>>,
}

impl<A: AccountStore> GeoquizServer<A> {
    pub async fn bind(addr: &str, hub: Arc<Hub<A>>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        Ok(Self { listener, hub })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    pub fn hub(&self) -> &Arc<Hub<A>> {
        &self.hub
    }

    /// Accepts connections forever; each gets its own task.
    pub async fn run(self) -> Result<(), ServerError> {
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let hub = Arc::clone(&self.hub);
            tokio::spawn(async move {
                if let Err(error) = handle_connection(stream, hub).await {
                    tracing::debug!(%peer, %error, "connection ended");
                }
            });
        }
    }
}

async fn handle_connection<A: AccountStore>(
    stream: TcpStream,
    hub: Arc<Hub<A>>,
) -> Result<(), ServerError> {
    let mut query = String::new();
    let ws = tokio_tungstenite::accept_hdr_async(stream, |request: &Request, response: Response| {
        if let Some(q) = request.uri().query() {
            query = q.to_string();
        }
        Ok(response)
    })
    .await?;

    let (mut sink, source) = ws.split();

    let params = match ConnectParams::parse(&query, hub.config()) {
        Ok(params) => params,
        Err(error) => {
            tracing::debug!(%error, "rejecting connection");
            let _ = sink.close().await;
            return Ok(());
        }
    };

    // Distinguish "first connection to this code" from a reconnection;
    // only the latter may restore from the snapshot cache.
    let known_code = hub.get(&params.room_code).await.is_some();
    let Some(room) = hub.get_or_create(&params.room_code).await else {
        // The code points at a room mid-teardown; treat it as expired
        // rather than racing the teardown.
        expire(&mut sink).await;
        return Ok(());
    };

    // Known session returning to a room everyone left: rebuild the
    // game from its snapshot before joining.
    if known_code
        && !params.session_id.is_empty()
        && hub
            .cache()
            .session_user(&params.room_code, &params.session_id)
            .await
            .is_some()
    {
        if let Some(snapshot) = hub.cache().get(&params.room_code).await {
            let _ = room.restore(snapshot).await;
            hub.cache().touch(&params.room_code).await;
        }
    }

    let avatar_url = if params.authenticated {
        hub.accounts()
            .find_avatar_url(&params.username)
            .await
            .unwrap_or_default()
    } else {
        String::new()
    };

    let (tx, rx) = mpsc::channel(CLIENT_QUEUE_SIZE);
    let id = ClientId::next();
    let outcome = match room
        .join(JoinRequest {
            id,
            username: params.username.clone(),
            session_id: params.session_id.clone(),
            avatar_url,
            settings: params.settings.clone(),
            sender: tx,
        })
        .await
    {
        Ok(outcome) => outcome,
        Err(_) => {
            expire(&mut sink).await;
            return Ok(());
        }
    };

    match outcome {
        CommandOutcome::Applied => {}
        CommandOutcome::Rejected(RejectReason::SessionCollision { username }) => {
            send_direct(
                &mut sink,
                &ServerMessage::SessionCollision {
                    message: "This session is already active in this room".to_string(),
                    username,
                },
            )
            .await;
            let _ = sink.close().await;
            return Ok(());
        }
        CommandOutcome::Rejected(reason) => {
            tracing::debug!(room = %params.room_code, %reason, "join rejected");
            let _ = sink.close().await;
            return Ok(());
        }
    }

    tracing::info!(
        room = %params.room_code,
        username = %params.username,
        client = %id,
        "connection joined"
    );

    let writer = tokio::spawn(write_pump(sink, rx));
    read_pump(source, &room, id).await;

    // Detach from the room; that drops our sender, which lets the
    // write pump finish with a clean close frame.
    let _ = room.leave(id).await;
    let _ = writer.await;
    Ok(())
}

async fn expire(sink: &mut WsSink) {
    send_direct(
        sink,
        &ServerMessage::RoomExpired {
            message: "This room no longer exists".to_string(),
        },
    )
    .await;
    let _ = sink.close().await;
}
