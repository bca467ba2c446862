//! Headless client loop: one WebSocket, one simulation frame every
//! [`CLIENT_FRAME`].

use std::future::Future;

use futures::{SinkExt, StreamExt};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::client::ArenaClient;
use crate::sim::tank::ControlInput;
use crate::util::time::{Timer, CLIENT_FRAME};
use crate::ws::protocol::{decode_server, encode, ProtocolError, ServerMsg};

/// Autopilot pattern: drive this long, then turn for `TURN_MS`
const DRIVE_MS: u64 = 2_500;
const TURN_MS: u64 = 800;
/// Fire attempt cadence; the tank cooldown still applies
const FIRE_EVERY_MS: u64 = 1_500;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[error("WebSocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Scripted input so the headless client moves and shoots like a player
#[derive(Debug, Default)]
struct Autopilot {
    last_fire_ms: u64,
}

impl Autopilot {
    fn input(&mut self, now_ms: u64) -> ControlInput {
        let turning = now_ms % (DRIVE_MS + TURN_MS) >= DRIVE_MS;
        let fire = now_ms.saturating_sub(self.last_fire_ms) >= FIRE_EVERY_MS;
        if fire {
            self.last_fire_ms = now_ms;
        }
        ControlInput {
            forward: !turning,
            left: turning,
            fire,
            ..Default::default()
        }
    }
}

/// Connect to `url` and play until the server closes the connection or
/// Ctrl+C is pressed.
pub async fn run_client(url: &str, bots: usize, seed: u64) -> Result<(), ClientError> {
    run_client_until(url, bots, seed, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

/// Same as [`run_client`], leaving when `shutdown` resolves.
pub async fn run_client_until<F>(
    url: &str,
    bots: usize,
    seed: u64,
    shutdown: F,
) -> Result<(), ClientError>
where
    F: Future<Output = ()>,
{
    let (socket, _response) = connect_async(url)
        .await
        .map_err(|source| ClientError::Connect {
            url: url.to_string(),
            source,
        })?;
    info!(url = %url, "Connected to arena");

    let (mut sink, mut stream) = socket.split();

    let mut client = ArenaClient::new(seed);
    let spawned = client.spawn_bots(bots);
    info!(bots = spawned, seed, "Local bots spawned");

    let clock = Timer::new();
    let mut autopilot = Autopilot::default();
    let mut frames = interval(CLIENT_FRAME);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Polled across iterations so a signal between frames is not lost
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let now = clock.elapsed_ms();
                // Drive only once the server has assigned our tank
                if client.own_id().is_some() {
                    client.set_input(autopilot.input(now));
                }
                client.tick(now);

                for position in client.drain_hit_effects() {
                    debug!(x = position.x, z = position.z, "Hit");
                }
                for msg in client.drain_outbox() {
                    sink.send(Message::Text(encode(&msg)?)).await?;
                }
            }
            incoming = stream.next() => {
                let text = match incoming {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Server closed the connection");
                        break;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => return Err(e.into()),
                };

                match decode_server(&text) {
                    Ok(msg) => {
                        log_server_msg(&msg);
                        client.handle_server_msg(msg, clock.elapsed_ms());
                    }
                    Err(e) => warn!(error = %e, "Failed to parse server message"),
                }
            }
            _ = &mut shutdown => {
                info!("Leaving arena");
                let _ = sink.send(Message::Close(None)).await;
                break;
            }
        }
    }

    Ok(())
}

fn log_server_msg(msg: &ServerMsg) {
    match msg {
        ServerMsg::Connected { id } => info!(participant_id = %id, "Assigned identity"),
        ServerMsg::PlayerJoined { id, .. } => info!(participant_id = %id, "Player joined"),
        ServerMsg::PlayerLeft { id } => info!(participant_id = %id, "Player left"),
        ServerMsg::PlayerDied { id, killer_id } => {
            info!(participant_id = %id, killer_id = %killer_id, "Player eliminated")
        }
        ServerMsg::RoundTimeUpdate { time_left } if time_left % 30 == 0 => {
            info!(time_left, "Round clock")
        }
        ServerMsg::RoundEnd { scores } => {
            info!(entries = scores.len(), "Round over");
            for (rank, entry) in scores.iter().enumerate() {
                info!(rank = rank + 1, participant_id = %entry.id, score = entry.score, "Standing");
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn autopilot_alternates_driving_and_turning() {
        let mut pilot = Autopilot::default();
        let driving = pilot.input(100);
        assert!(driving.forward && !driving.left);
        let turning = pilot.input(DRIVE_MS + 100);
        assert!(turning.left && !turning.forward);
    }

    #[test]
    fn autopilot_fire_is_paced() {
        let mut pilot = Autopilot::default();
        assert!(pilot.input(FIRE_EVERY_MS).fire);
        assert!(!pilot.input(FIRE_EVERY_MS + 10).fire);
        assert!(pilot.input(2 * FIRE_EVERY_MS).fire);
    }

    #[tokio::test]
    async fn unreachable_server_is_a_connect_error() {
        // Grab a free port, then release it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = run_client(&format!("ws://{addr}/ws"), 0, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Connect { .. }));
    }

    #[tokio::test]
    async fn shutdown_closes_the_socket_cleanly() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            while let Some(frame) = ws.next().await {
                if let Ok(Message::Close(_)) = frame {
                    return true;
                }
            }
            false
        });

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tx.send(()).unwrap();
        run_client_until(&format!("ws://{addr}/ws"), 2, 7, async move {
            let _ = rx.await;
        })
        .await
        .unwrap();

        assert!(server.await.unwrap());
    }
}
