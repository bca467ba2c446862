//! End-to-end checks of the realtime channel over a real socket.

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use tank_arena_server::app::AppState;
use tank_arena_server::config::Config;
use tank_arena_server::http::build_router;
use tank_arena_server::sim::physics::{Rotation, Vec3};
use tank_arena_server::ws::protocol::{decode_server, encode, ClientMsg, ServerMsg};

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server(config: Config) -> SocketAddr {
    let (state, coordinator) = AppState::new(config);
    tokio::spawn(coordinator.run());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn connect(addr: SocketAddr) -> (Socket, Uuid) {
    let (mut socket, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    match next_event(&mut socket).await {
        ServerMsg::Connected { id } => (socket, id),
        other => panic!("expected connected, got {other:?}"),
    }
}

/// Next event, skipping the round clock
async fn next_event(socket: &mut Socket) -> ServerMsg {
    loop {
        let msg = next_raw(socket).await;
        if !matches!(msg, ServerMsg::RoundTimeUpdate { .. }) {
            return msg;
        }
    }
}

async fn next_raw(socket: &mut Socket) -> ServerMsg {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for server event")
            .expect("socket closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return decode_server(&text).unwrap();
        }
    }
}

async fn send(socket: &mut Socket, msg: &ClientMsg) {
    socket
        .send(Message::Text(encode(msg).unwrap()))
        .await
        .unwrap();
}

#[tokio::test]
async fn joins_are_announced_and_replayed() {
    let addr = start_server(Config::default()).await;

    let (mut a, a_id) = connect(addr).await;
    assert_eq!(
        next_event(&mut a).await,
        ServerMsg::PlayerJoined {
            id: a_id,
            position: Vec3::ZERO
        }
    );

    let (mut b, b_id) = connect(addr).await;
    assert_eq!(
        next_event(&mut b).await,
        ServerMsg::PlayerJoined {
            id: b_id,
            position: Vec3::ZERO
        }
    );
    assert_eq!(
        next_event(&mut a).await,
        ServerMsg::PlayerJoined {
            id: b_id,
            position: Vec3::ZERO
        }
    );

    // `join` replays everyone already present, excluding the requester
    send(&mut b, &ClientMsg::Join).await;
    assert_eq!(
        next_event(&mut b).await,
        ServerMsg::PlayerJoined {
            id: a_id,
            position: Vec3::ZERO
        }
    );
}

#[tokio::test]
async fn moves_skip_the_sender_and_shots_reach_everyone() {
    let addr = start_server(Config::default()).await;
    let (mut a, a_id) = connect(addr).await;
    next_event(&mut a).await;
    let (mut b, b_id) = connect(addr).await;
    next_event(&mut b).await;
    next_event(&mut a).await;

    let position = Vec3::new(3.0, 0.0, -2.0);
    let rotation = Rotation::yaw(1.2);
    send(&mut a, &ClientMsg::UpdatePosition { position, rotation }).await;
    send(&mut a, &ClientMsg::Shoot { position, rotation }).await;

    assert_eq!(
        next_event(&mut b).await,
        ServerMsg::PlayerMoved {
            id: a_id,
            position,
            rotation
        }
    );
    let shot = ServerMsg::PlayerShot {
        id: a_id,
        position,
        rotation,
    };
    assert_eq!(next_event(&mut b).await, shot);
    // The shooter's first event is its own shot echo, not its move
    assert_eq!(next_event(&mut a).await, shot);

    // Hits go to the target only
    send(
        &mut a,
        &ClientMsg::PlayerHit {
            target_id: Some(b_id),
            damage: 20,
        },
    )
    .await;
    assert_eq!(
        next_event(&mut b).await,
        ServerMsg::PlayerHit {
            id: b_id,
            damage: 20
        }
    );

    // Departure is announced to the rest
    b.close(None).await.unwrap();
    assert_eq!(next_event(&mut a).await, ServerMsg::PlayerLeft { id: b_id });
}

#[tokio::test]
async fn short_round_counts_down_and_ends() {
    let addr = start_server(Config {
        round_secs: 2,
        round_break_secs: 1,
        ..Config::default()
    })
    .await;
    let (mut a, a_id) = connect(addr).await;

    let mut clock = Vec::new();
    let scores = loop {
        match next_raw(&mut a).await {
            ServerMsg::RoundTimeUpdate { time_left } => clock.push(time_left),
            ServerMsg::RoundEnd { scores } => break scores,
            _ => {}
        }
    };

    assert_eq!(clock, vec![1, 0]);
    assert_eq!(scores.len(), 1);
    assert_eq!(scores[0].id, a_id);
    assert_eq!(scores[0].score, 0);
}

#[tokio::test]
async fn silent_peer_does_not_hold_back_others() {
    let addr = start_server(Config {
        outbound_buffer: 2,
        ..Config::default()
    })
    .await;

    // Connected but never read from again
    let (_stalled, _) = connect(addr).await;
    let (mut a, _) = connect(addr).await;
    let (mut b, _) = connect(addr).await;

    for step in 0..50 {
        send(
            &mut a,
            &ClientMsg::UpdatePosition {
                position: Vec3::new(step as f32, 0.0, 0.0),
                rotation: Rotation::yaw(0.0),
            },
        )
        .await;
    }

    // b may skip intermediate moves but always gets the newest one
    let last = Vec3::new(49.0, 0.0, 0.0);
    loop {
        if let ServerMsg::PlayerMoved { position, .. } = next_event(&mut b).await {
            if position == last {
                break;
            }
        }
    }
}
