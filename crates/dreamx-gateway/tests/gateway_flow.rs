//! End-to-end socket flow against a live listener

use std::sync::Arc;
use std::time::Duration;

use dreamx_common::JwtService;
use dreamx_core::{Snowflake, User, UserRepository};
use dreamx_db::{create_memory_pool, run_migrations, SqliteUserRepository};
use dreamx_gateway::server::create_app;
use dreamx_gateway::{ConnectionManager, GatewayState};
use dreamx_realtime::{BusMessage, EventBus, LocalEventBus, Room};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

const SECRET: &str = "flow-secret";

struct Fixture {
    url: String,
    bus: Arc<dyn EventBus>,
    token: String,
    user_id: Snowflake,
}

async fn start() -> Fixture {
    let pool = create_memory_pool().await.unwrap();
    run_migrations(&pool).await.unwrap();
    let users = Arc::new(SqliteUserRepository::new(pool));
    let user = User::new(Snowflake::new(501), "ana".into(), "ana@example.com".into(), "Ana".into());
    users.create(&user, None).await.unwrap();

    let jwt = Arc::new(JwtService::new(SECRET, 900, 3600));
    let token = jwt.generate_token_pair(user.id).unwrap().access_token;
    let bus: Arc<dyn EventBus> = Arc::new(LocalEventBus::default());

    let state = GatewayState::new(jwt, users, Arc::clone(&bus), ConnectionManager::new_shared(), 30_000);
    state.start();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, create_app(state)).await });

    Fixture {
        url: format!("ws://{addr}/gateway"),
        bus,
        token,
        user_id: user.id,
    }
}

async fn next_json<S>(stream: &mut S) -> Value
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let frame = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("frame in time")
        .expect("stream open")
        .expect("valid frame");
    match frame {
        Message::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("unexpected frame {other:?}"),
    }
}

#[tokio::test]
async fn test_hello_identify_dispatch_heartbeat() {
    let fixture = start().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&fixture.url).await.unwrap();

    let hello = next_json(&mut ws).await;
    assert_eq!(hello["op"], 10);
    assert_eq!(hello["d"]["heartbeat_interval"], 30_000);

    let identify = serde_json::json!({"op": 2, "d": {"token": fixture.token}});
    ws.send(Message::Text(identify.to_string())).await.unwrap();
    let ready = next_json(&mut ws).await;
    assert_eq!(ready["op"], 0);
    assert_eq!(ready["t"], "READY");
    assert_eq!(ready["s"], 1);
    assert_eq!(ready["d"]["user"]["id"], fixture.user_id.to_string());

    fixture
        .bus
        .publish(BusMessage::new(Room::user(fixture.user_id), "NOTIFICATION_CREATE", serde_json::json!({"kind": "follow"})))
        .await
        .unwrap();
    let event = next_json(&mut ws).await;
    assert_eq!(event["t"], "NOTIFICATION_CREATE");
    assert_eq!(event["s"], 2);
    assert_eq!(event["d"]["kind"], "follow");

    ws.send(Message::Text(r#"{"op":1,"d":2}"#.into())).await.unwrap();
    let ack = next_json(&mut ws).await;
    assert_eq!(ack["op"], 11);
}

#[tokio::test]
async fn test_bad_token_closes_with_auth_failed() {
    let fixture = start().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&fixture.url).await.unwrap();
    next_json(&mut ws).await;

    ws.send(Message::Text(r#"{"op":2,"d":{"token":"nope"}}"#.into())).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next()).await.unwrap().unwrap().unwrap();
    let Message::Close(Some(close)) = frame else { panic!("expected close frame, got {frame:?}") };
    assert_eq!(u16::from(close.code), 4004);
}

#[tokio::test]
async fn test_garbage_closes_with_decode_error() {
    let fixture = start().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(&fixture.url).await.unwrap();
    next_json(&mut ws).await;

    ws.send(Message::Text("{not json".into())).await.unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(2), ws.next()).await.unwrap().unwrap().unwrap();
    let Message::Close(Some(close)) = frame else { panic!("expected close frame, got {frame:?}") };
    assert_eq!(u16::from(close.code), 4002);
}
