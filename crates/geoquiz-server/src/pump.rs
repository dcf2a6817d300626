//! Per-connection socket pumps.
//!
//! Each accepted connection splits into two halves. The write pump
//! drains the client's outbound queue onto the socket and keeps the
//! connection alive with periodic pings; the read pump turns inbound
//! text frames into room commands. When the room drops a client (slow
//! consumer, teardown) the queue closes and the write pump sends a
//! proper close frame on its way out.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use geoquiz_protocol::{ClientMessage, ServerMessage};
use geoquiz_room::{ClientId, RoomHandle};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::WebSocketStream;

/// Keep-alives well inside the common 60s proxy idle timeout.
const PING_INTERVAL: Duration = Duration::from_secs(54);

pub(crate) type WsSink = SplitSink<WebSocketStream<TcpStream>, WsMessage>;
pub(crate) type WsSource = SplitStream<WebSocketStream<TcpStream>>;

/// Encodes one message straight onto the socket, outside any queue.
/// Used for pre-join rejections (expired room, session collision).
pub(crate) async fn send_direct(sink: &mut WsSink, message: &ServerMessage) {
    match geoquiz_protocol::encode(message) {
        Ok(text) => {
            let _ = sink.send(WsMessage::Text(text.into())).await;
        }
        Err(error) => {
            tracing::error!(%error, "unencodable server message");
        }
    }
}

/// Drains the outbound queue until it closes or the socket dies.
pub(crate) async fn write_pump(mut sink: WsSink, mut rx: mpsc::Receiver<ServerMessage>) {
    let mut ping = tokio::time::interval(PING_INTERVAL);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick is immediate; the connection doesn't need a ping yet.
    ping.tick().await;

    loop {
        tokio::select! {
            message = rx.recv() => match message {
                Some(message) => match geoquiz_protocol::encode(&message) {
                    Ok(text) => {
                        if sink.send(WsMessage::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::error!(%error, "unencodable server message");
                    }
                },
                // The room detached this client; close cleanly.
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if sink.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Feeds inbound frames to the room until the socket or room goes away.
/// Malformed frames are logged and dropped; the connection lives on.
pub(crate) async fn read_pump(mut source: WsSource, room: &RoomHandle, id: ClientId) {
    while let Some(frame) = source.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(error) => {
                tracing::debug!(client = %id, %error, "socket read failed");
                break;
            }
        };
        match frame {
            WsMessage::Text(text) => {
                match geoquiz_protocol::decode::<ClientMessage>(text.as_str()) {
                    Ok(message) => {
                        if room.message(id, message).await.is_err() {
                            // Room torn down under us.
                            break;
                        }
                    }
                    Err(error) => {
                        tracing::debug!(client = %id, %error, "dropping malformed frame");
                    }
                }
            }
            WsMessage::Close(_) => break,
            // Pings are answered by the library; binary is not part of
            // the protocol.
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) | WsMessage::Frame(_) => {}
        }
    }
}
