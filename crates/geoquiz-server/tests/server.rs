//! Socket-level tests: a real listener, real WebSocket clients.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use geoquiz_countries::CountryProvider;
use geoquiz_protocol::{decode, ServerMessage};
use geoquiz_room::{CacheConfig, Hub, NoopAccountStore, RoomConfig, RoomStateCache};
use geoquiz_server::GeoquizServer;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type ClientWs = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (String, Arc<Hub<NoopAccountStore>>) {
    let countries = Arc::new(CountryProvider::embedded().expect("embedded table"));
    let cache = Arc::new(RoomStateCache::new(CacheConfig::default()));
    let hub = Hub::new(
        RoomConfig::default(),
        countries,
        cache,
        Arc::new(NoopAccountStore),
    );
    let server = GeoquizServer::bind("127.0.0.1:0", Arc::clone(&hub))
        .await
        .expect("bind");
    let addr = server.local_addr().expect("local addr");
    tokio::spawn(server.run());
    (format!("ws://{addr}/ws"), hub)
}

/// Next protocol message, skipping control frames.
async fn recv(ws: &mut ClientWs) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let frame = ws
                .next()
                .await
                .expect("connection closed")
                .expect("socket error");
            if let WsMessage::Text(text) = frame {
                return decode::<ServerMessage>(text.as_str()).expect("undecodable frame");
            }
        }
    })
    .await
    .expect("timed out waiting for a message")
}

async fn recv_until(
    ws: &mut ClientWs,
    what: &str,
    pred: impl Fn(&ServerMessage) -> bool,
) -> ServerMessage {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let msg = recv(ws).await;
            if pred(&msg) {
                return msg;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
}

#[tokio::test]
async fn test_join_chat_and_start_over_a_socket() {
    let (base, _hub) = start_server().await;
    let (mut ws, _) = connect_async(format!(
        "{base}?room=SOCK1&username=alice&type=SINGLE&mode=FLAG"
    ))
    .await
    .expect("connect");

    let update = recv(&mut ws).await;
    let ServerMessage::RoomUpdate {
        owner,
        current_count,
        ..
    } = update
    else {
        panic!("expected room_update first, got {update:?}");
    };
    assert_eq!(owner, "alice");
    assert_eq!(current_count, 1);

    recv_until(&mut ws, "player_joined", |m| {
        matches!(m, ServerMessage::PlayerJoined { player_name, .. } if player_name == "alice")
    })
    .await;

    // A malformed frame is dropped, not fatal.
    ws.send(WsMessage::Text("{not json".into())).await.unwrap();

    ws.send(WsMessage::Text(
        r#"{"type":"chat_message","payload":{"message":"hello"}}"#.into(),
    ))
    .await
    .unwrap();
    let chat = recv_until(&mut ws, "chat", |m| {
        matches!(m, ServerMessage::ChatMessage { .. })
    })
    .await;
    let ServerMessage::ChatMessage {
        player_name,
        message,
        ..
    } = chat
    else {
        unreachable!()
    };
    assert_eq!(player_name, "alice");
    assert_eq!(message, "hello");

    ws.send(WsMessage::Text(r#"{"type":"start_game"}"#.into()))
        .await
        .unwrap();
    let started = recv_until(&mut ws, "round_started", |m| {
        matches!(m, ServerMessage::RoundStarted(_))
    })
    .await;
    let ServerMessage::RoundStarted(state) = started else {
        unreachable!()
    };
    assert_eq!(state.current_round, 1);
    assert!(state.question.is_some());
}

#[tokio::test]
async fn test_missing_params_closes_the_connection() {
    let (base, hub) = start_server().await;
    let (mut ws, _) = connect_async(format!("{base}?username=alice"))
        .await
        .expect("upgrade still succeeds");

    let closed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                None | Some(Ok(WsMessage::Close(_))) => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "connection was not closed");
    assert_eq!(hub.room_count().await, 0);
}

#[tokio::test]
async fn test_session_collision_over_sockets() {
    let (base, _hub) = start_server().await;
    let url = format!("{base}?room=SOCK2&username=alice&session=s-77&type=SINGLE");

    let (mut first, _) = connect_async(&url).await.expect("first connect");
    recv_until(&mut first, "player_joined", |m| {
        matches!(m, ServerMessage::PlayerJoined { .. })
    })
    .await;

    let (mut second, _) = connect_async(&url).await.expect("second connect");
    let rejection = recv(&mut second).await;
    let ServerMessage::SessionCollision { username, .. } = rejection else {
        panic!("expected session_collision, got {rejection:?}");
    };
    assert_eq!(username, "alice");
}

#[tokio::test]
async fn test_two_players_see_each_other() {
    let (base, _hub) = start_server().await;
    let (mut alice, _) = connect_async(format!(
        "{base}?room=SOCK3&username=alice&type=PUBLIC&mode=FLAG"
    ))
    .await
    .unwrap();
    recv_until(&mut alice, "alice joined", |m| {
        matches!(m, ServerMessage::PlayerJoined { .. })
    })
    .await;

    let (mut bob, _) = connect_async(format!("{base}?room=SOCK3&username=bob"))
        .await
        .unwrap();
    recv_until(&mut bob, "bob's roster", |m| {
        matches!(m, ServerMessage::RoomUpdate { current_count: 2, .. })
    })
    .await;

    recv_until(&mut alice, "bob joined", |m| {
        matches!(m, ServerMessage::PlayerJoined { player_name, .. } if player_name == "bob")
    })
    .await;

    // Bob leaving reaches alice.
    drop(bob);
    recv_until(&mut alice, "bob left", |m| {
        matches!(m, ServerMessage::PlayerLeft { player_name, .. } if player_name == "bob")
    })
    .await;
}
