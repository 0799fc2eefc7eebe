//! Integration tests for the world server
//!
//! Each test starts a real server on an ephemeral port and talks to it with
//! the client library, so routing, binding, broadcasts and shutdown are all
//! exercised end to end.

use client::network::{register_world, ClientError, WorldClient};
use server::config::WorldConfig;
use server::network;
use server::session::SessionManager;
use shared::{EnvironmentObject, GeneratorConfig, ServerMessage};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_test::{assert_err, assert_ok};

const WAIT: Duration = Duration::from_secs(2);
const QUIET: Duration = Duration::from_millis(200);

/// A running server. Dropping it stops the server.
struct TestServer {
    base: String,
    manager: Arc<SessionManager>,
    _shutdown: oneshot::Sender<()>,
}

fn small_world_config() -> WorldConfig {
    WorldConfig {
        generator: GeneratorConfig {
            object_count: 60,
            ..GeneratorConfig::with_dimensions(4000.0, 4000.0)
        },
        ..WorldConfig::default()
    }
}

async fn start_server(config: WorldConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let manager = Arc::new(SessionManager::new(config));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    // No client page is installed for tests; page requests answer 404.
    let static_dir = PathBuf::from("target/no-such-static-dir");
    let served = Arc::clone(&manager);
    tokio::spawn(async move {
        let _ = network::serve(listener, served, static_dir, async {
            let _ = shutdown_rx.await;
        })
        .await;
    });

    TestServer {
        base: format!("http://{}", addr),
        manager,
        _shutdown: shutdown_tx,
    }
}

async fn join(server: &TestServer, world: &str) -> (WorldClient, u32) {
    let mut socket = WorldClient::connect(&server.base, world).await.unwrap();
    match socket.next_message_within(WAIT).await.unwrap() {
        ServerMessage::InitAck { id, .. } => (socket, id),
        other => panic!("Expected init_ack, got {:?}", other),
    }
}

async fn expect_quiet(socket: &mut WorldClient) {
    match socket.next_message_within(QUIET).await {
        Err(ClientError::Timeout) => {}
        other => panic!("Expected no traffic, got {:?}", other),
    }
}

async fn wait_for_player_count(server: &TestServer, world: &str, expected: usize) {
    let world = server.manager.world(world).await.unwrap();
    let deadline = tokio::time::Instant::now() + WAIT;
    while world.player_count().await != expected {
        assert!(
            tokio::time::Instant::now() < deadline,
            "World still has {} players, expected {}",
            world.player_count().await,
            expected
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// SESSION BINDING TESTS
mod binding_tests {
    use super::*;

    #[tokio::test]
    async fn http_route_registers_world() {
        let server = start_server(small_world_config()).await;

        assert_ok!(register_world(&server.base, "meadow").await);
        assert_eq!(
            server.manager.seeds().lookup("meadow").await.as_deref(),
            Some("meadow")
        );

        // Registration alone does not generate anything.
        assert_eq!(server.manager.world_count().await, 0);

        let (socket, id) = join(&server, "meadow").await;
        assert!(id >= 1);
        assert_eq!(server.manager.world_count().await, 1);
        socket.close().await.unwrap();
    }

    #[tokio::test]
    async fn world_named_assets_is_not_shadowed_by_static_files() {
        let server = start_server(small_world_config()).await;

        assert_ok!(register_world(&server.base, "assets").await);
        assert_eq!(
            server.manager.seeds().lookup("assets").await.as_deref(),
            Some("assets")
        );

        let (socket, _) = join(&server, "assets").await;
        socket.close().await.unwrap();
    }

    #[tokio::test]
    async fn unregistered_world_is_rejected() {
        let server = start_server(small_world_config()).await;

        let mut socket = WorldClient::connect(&server.base, "nowhere").await.unwrap();
        match socket.next_message_within(WAIT).await {
            Err(ClientError::Closed(Some(reason))) => assert!(reason.contains("nowhere")),
            other => panic!("Expected close frame, got {:?}", other),
        }
        assert_eq!(server.manager.world_count().await, 0);
    }

    #[tokio::test]
    async fn missing_world_name_is_rejected() {
        let server = start_server(small_world_config()).await;

        let mut socket = WorldClient::connect(&server.base, "").await.unwrap();
        assert_err!(socket.next_message_within(WAIT).await);
        assert_eq!(server.manager.world_count().await, 0);
    }

    #[tokio::test]
    async fn sanitized_names_share_a_world() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("my-world").await.unwrap();

        let (mut first, first_id) = join(&server, "my-world").await;
        let mut second = WorldClient::connect(&server.base, "my_world").await.unwrap();
        match second.next_message_within(WAIT).await.unwrap() {
            ServerMessage::InitAck { seed, players, .. } => {
                assert_eq!(seed, "my_world");
                assert!(players.contains_key(&first_id));
            }
            other => panic!("Expected init_ack, got {:?}", other),
        }

        assert!(matches!(
            first.next_message_within(WAIT).await.unwrap(),
            ServerMessage::NewPlayer { .. }
        ));
        assert_eq!(server.manager.world_count().await, 1);
    }
}

/// BROADCAST TESTS
mod broadcast_tests {
    use super::*;

    #[tokio::test]
    async fn worlds_are_isolated() {
        let server = start_server(small_world_config()).await;
        assert_ok!(register_world(&server.base, "worldX").await);
        assert_ok!(register_world(&server.base, "worldY").await);

        let (mut a, a_id) = join(&server, "worldX").await;
        let (mut b, _) = join(&server, "worldY").await;

        let mut c = WorldClient::connect(&server.base, "worldX").await.unwrap();
        let c_id = match c.next_message_within(WAIT).await.unwrap() {
            ServerMessage::InitAck { id, players, .. } => {
                assert_eq!(players.len(), 2);
                assert!(players.contains_key(&a_id));
                assert!(players.contains_key(&id));
                id
            }
            other => panic!("Expected init_ack, got {:?}", other),
        };

        match a.next_message_within(WAIT).await.unwrap() {
            ServerMessage::NewPlayer { player_id, .. } => assert_eq!(player_id, c_id),
            other => panic!("Expected newPlayer, got {:?}", other),
        }

        c.send_move(100.0, 200.0, Some("left".to_string()))
            .await
            .unwrap();
        match a.next_message_within(WAIT).await.unwrap() {
            ServerMessage::PlayerMove { player_id, x, y } => {
                assert_eq!(player_id, c_id);
                assert_eq!((x, y), (100.0, 200.0));
            }
            other => panic!("Expected playerMove, got {:?}", other),
        }

        // Nothing from worldX reaches worldY, and movers do not hear themselves.
        expect_quiet(&mut b).await;
        expect_quiet(&mut c).await;
    }

    #[tokio::test]
    async fn departure_is_announced() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("harbor").await.unwrap();

        let (mut stay, _) = join(&server, "harbor").await;
        let (leave, leave_id) = join(&server, "harbor").await;
        assert!(matches!(
            stay.next_message_within(WAIT).await.unwrap(),
            ServerMessage::NewPlayer { .. }
        ));

        leave.close().await.unwrap();
        match stay.next_message_within(WAIT).await.unwrap() {
            ServerMessage::RemovePlayer { player_id } => assert_eq!(player_id, leave_id),
            other => panic!("Expected removePlayer, got {:?}", other),
        }
        wait_for_player_count(&server, "harbor", 1).await;
    }

    #[tokio::test]
    async fn registry_tracks_connects_and_disconnects() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("plaza").await.unwrap();

        let mut sockets = Vec::new();
        for _ in 0..6 {
            sockets.push(join(&server, "plaza").await);
        }
        wait_for_player_count(&server, "plaza", 6).await;

        let leaving: Vec<_> = sockets.drain(..4).collect();
        let remaining: Vec<u32> = sockets.iter().map(|(_, id)| *id).collect();
        for (socket, _) in leaving {
            socket.close().await.unwrap();
        }
        wait_for_player_count(&server, "plaza", 2).await;

        let world = server.manager.world("plaza").await.unwrap();
        let mut ids = world.player_ids().await;
        ids.sort_unstable();
        let mut expected = remaining;
        expected.sort_unstable();
        assert_eq!(ids, expected);
    }
}

/// MESSAGE HANDLING TESTS
mod message_tests {
    use super::*;

    #[tokio::test]
    async fn viewport_returns_visible_subset() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("forest").await.unwrap();

        let (mut socket, _) = join(&server, "forest").await;
        let (mut peer, _) = join(&server, "forest").await;
        assert!(matches!(
            socket.next_message_within(WAIT).await.unwrap(),
            ServerMessage::NewPlayer { .. }
        ));

        socket
            .send_viewport(1000.0, 1000.0, 800.0, 600.0)
            .await
            .unwrap();
        let objects = match socket.next_message_within(WAIT).await.unwrap() {
            ServerMessage::Environment { objects } => objects,
            other => panic!("Expected environment, got {:?}", other),
        };

        let world = server.manager.world("forest").await.unwrap();
        assert_eq!(objects, world.visible_environment(1000.0, 1000.0, 800.0, 600.0));

        let margin = world.config().viewport_margin;
        for obj in &objects {
            let (x, y) = obj.position();
            assert!(x >= 1000.0 - (400.0 + margin) && x <= 1000.0 + (400.0 + margin));
            assert!(y >= 1000.0 - (300.0 + margin) && y <= 1000.0 + (300.0 + margin));
        }

        // The response is unicast.
        expect_quiet(&mut peer).await;
    }

    #[tokio::test]
    async fn whole_world_viewport_returns_everything() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("tundra").await.unwrap();

        let (mut socket, _) = join(&server, "tundra").await;
        socket
            .send_viewport(2000.0, 2000.0, 4000.0, 4000.0)
            .await
            .unwrap();

        match socket.next_message_within(WAIT).await.unwrap() {
            ServerMessage::Environment { objects } => {
                let world = server.manager.world("tundra").await.unwrap();
                assert_eq!(objects.len(), world.index().len());
                assert!(objects
                    .iter()
                    .any(|obj| matches!(obj, EnvironmentObject::BlockingRegion { .. })));
            }
            other => panic!("Expected environment, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn full_snapshot_sends_environment_on_join() {
        let config = WorldConfig {
            full_snapshot: true,
            ..small_world_config()
        };
        let server = start_server(config).await;
        server.manager.register_world("desert").await.unwrap();

        let mut socket = WorldClient::connect(&server.base, "desert").await.unwrap();
        match socket.next_message_within(WAIT).await.unwrap() {
            ServerMessage::InitAck { environment, .. } => {
                let world = server.manager.world("desert").await.unwrap();
                assert_eq!(environment.as_slice(), world.index().objects());
            }
            other => panic!("Expected init_ack, got {:?}", other),
        }

        // Viewport requests are ignored in this mode.
        socket.send_viewport(0.0, 0.0, 500.0, 500.0).await.unwrap();
        expect_quiet(&mut socket).await;
    }

    #[tokio::test]
    async fn malformed_messages_keep_connection_open() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("swamp").await.unwrap();

        let (mut watcher, _) = join(&server, "swamp").await;
        let (mut sender, sender_id) = join(&server, "swamp").await;
        assert!(matches!(
            watcher.next_message_within(WAIT).await.unwrap(),
            ServerMessage::NewPlayer { .. }
        ));

        sender.send_raw("this is not json").await.unwrap();
        sender.send_raw(r#"{"type":"teleport","x":1}"#).await.unwrap();
        sender.send_raw(r#"{"type":"move","x":"far"}"#).await.unwrap();
        expect_quiet(&mut watcher).await;

        sender.send_move(5.0, 6.0, None).await.unwrap();
        match watcher.next_message_within(WAIT).await.unwrap() {
            ServerMessage::PlayerMove { player_id, x, y } => {
                assert_eq!(player_id, sender_id);
                assert_eq!((x, y), (5.0, 6.0));
            }
            other => panic!("Expected playerMove, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn extreme_coordinates_do_not_break_later_joins() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("abyss").await.unwrap();

        let (mut watcher, _) = join(&server, "abyss").await;
        let (mut mover, mover_id) = join(&server, "abyss").await;
        assert!(matches!(
            watcher.next_message_within(WAIT).await.unwrap(),
            ServerMessage::NewPlayer { .. }
        ));

        // Beyond f64 range: rejected as malformed, nothing is relayed.
        mover
            .send_raw(r#"{"type":"move","x":1e309,"y":0}"#)
            .await
            .unwrap();
        expect_quiet(&mut watcher).await;

        mover
            .send_raw(r#"{"type":"move","x":1e39,"y":0.1}"#)
            .await
            .unwrap();
        match watcher.next_message_within(WAIT).await.unwrap() {
            ServerMessage::PlayerMove { x, y, .. } => assert_eq!((x, y), (1e39, 0.1)),
            other => panic!("Expected playerMove, got {:?}", other),
        }

        let mut late = WorldClient::connect(&server.base, "abyss").await.unwrap();
        match late.next_message_within(WAIT).await.unwrap() {
            ServerMessage::InitAck { players, .. } => {
                let position = players[&mover_id];
                assert_eq!((position.x, position.y), (1e39, 0.1));
            }
            other => panic!("Expected init_ack, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn legacy_viewport_alias_is_accepted() {
        let server = start_server(small_world_config()).await;
        server.manager.register_world("canyon").await.unwrap();

        let (mut socket, _) = join(&server, "canyon").await;
        socket
            .send_raw(r#"{"type":"updateViewport","x":500,"y":500,"width":100,"height":100}"#)
            .await
            .unwrap();
        assert!(matches!(
            socket.next_message_within(WAIT).await.unwrap(),
            ServerMessage::Environment { .. }
        ));
    }
}
