//! Server network layer handling UDP request/response traffic

use crate::directory::InMemoryPlayerDirectory;
use crate::notifier::{Notification, Notifier};
use crate::service::GameService;
use crate::store::InMemorySessionStore;
use bincode::{deserialize, serialize, serialized_size};
use log::{debug, error, info, warn};
use shared::{ErrorKind, Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

pub type ServerResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived { packet: Packet, addr: SocketAddr },
    Shutdown,
}

/// Messages queued for the network sender task
#[derive(Debug)]
pub enum GameMessage {
    SendPacket {
        packet: Packet,
        addr: SocketAddr,
    },
    Notify {
        packet: Packet,
        devices: Vec<String>,
    },
}

/// Queues round-ended packets for the sender task
pub struct PacketNotifier {
    game_tx: mpsc::UnboundedSender<GameMessage>,
}

impl PacketNotifier {
    pub fn new(game_tx: mpsc::UnboundedSender<GameMessage>) -> Self {
        Self { game_tx }
    }
}

impl Notifier for PacketNotifier {
    fn notify(&self, devices: Vec<String>, message: Notification) {
        let packet = Packet::RoundEnded {
            game_id: message.game_id,
            action: message.action,
        };
        if let Err(e) = self.game_tx.send(GameMessage::Notify { packet, devices }) {
            warn!("Dropping round-ended notification: {}", e);
        }
    }
}

/// Lets other tasks stop a running [`Server`]
#[derive(Clone)]
pub struct ServerHandle {
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl ServerHandle {
    pub fn shutdown(&self) {
        if self.server_tx.send(ServerMessage::Shutdown).is_err() {
            debug!("Server already stopped");
        }
    }
}

/// UDP front end for the game service
pub struct Server {
    socket: Arc<UdpSocket>,
    service: Arc<GameService>,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: Option<mpsc::UnboundedReceiver<GameMessage>>,
}

impl Server {
    /// Binds the socket and wires an in-memory store and player directory
    pub async fn new(addr: &str, max_sessions: usize) -> ServerResult<Self> {
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        let service = Arc::new(GameService::new(
            Arc::new(InMemorySessionStore::new(max_sessions)),
            Arc::new(InMemoryPlayerDirectory::new()),
            Arc::new(PacketNotifier::new(game_tx.clone())),
        ));

        Ok(Server {
            socket,
            service,
            server_tx,
            server_rx,
            game_tx,
            game_rx: Some(game_rx),
        })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            server_tx: self.server_tx.clone(),
        }
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = vec![0u8; MAX_DATAGRAM_SIZE];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes outgoing packet queue
    fn spawn_network_sender(&mut self) {
        let Some(mut game_rx) = self.game_rx.take() else {
            return;
        };
        let socket = Arc::clone(&self.socket);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendPacket { packet, addr } => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    GameMessage::Notify { packet, devices } => {
                        for device in devices {
                            let addr = match device.parse::<SocketAddr>() {
                                Ok(addr) => addr,
                                Err(_) => {
                                    warn!("Skipping notification to bad address {:?}", device);
                                    continue;
                                }
                            };

                            if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                                warn!("Failed to notify {}: {}", addr, e);
                            }
                        }
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &Packet,
        addr: SocketAddr,
    ) -> ServerResult<()> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    /// Runs one request against the service and builds the reply
    pub async fn handle_packet(
        service: &GameService,
        packet: Packet,
        addr: SocketAddr,
    ) -> Packet {
        let result = match packet {
            Packet::RegisterPlayer { name } => {
                let player = service.register_player(&name, &addr.to_string()).await;
                Ok(Packet::PlayerRegistered { player })
            }
            Packet::CreateGame => service
                .create_game()
                .await
                .map(|game| Packet::GameState { game }),
            Packet::JoinGame { game_id, player_id } => service
                .join_game(game_id, player_id)
                .await
                .map(|game| Packet::GameState { game }),
            Packet::SubmitMove {
                game_id,
                player_id,
                action,
                override_checks,
            } => service
                .submit_move(game_id, player_id, &action, override_checks)
                .await
                .map(|game| Packet::GameState { game }),
            Packet::GetGame { game_id } => service
                .get_game(game_id)
                .await
                .map(|game| Packet::GameState { game }),
            _ => {
                warn!("Unexpected packet type from client at {}", addr);
                return Packet::Error {
                    kind: ErrorKind::BadRequest,
                    message: "unexpected packet type".to_string(),
                };
            }
        };

        let reply = result.unwrap_or_else(|e| {
            debug!("Request from {} failed: {}", addr, e);
            Packet::Error {
                kind: e.kind(),
                message: e.to_string(),
            }
        });

        Self::fit_to_datagram(reply, addr)
    }

    /// Replaces a reply that cannot fit in one datagram with an error the
    /// client can still read
    fn fit_to_datagram(reply: Packet, addr: SocketAddr) -> Packet {
        let size = match serialized_size(&reply) {
            Ok(size) => size as usize,
            Err(_) => return reply,
        };
        if size <= MAX_DATAGRAM_SIZE {
            return reply;
        }

        warn!(
            "Reply to {} is {} bytes, over the {} byte datagram limit",
            addr, size, MAX_DATAGRAM_SIZE
        );
        Packet::Error {
            kind: ErrorKind::ResponseTooLarge,
            message: format!(
                "reply of {} bytes exceeds the {} byte datagram limit",
                size, MAX_DATAGRAM_SIZE
            ),
        }
    }

    /// Hands a request to its own task so different games proceed in parallel
    fn dispatch(&self, packet: Packet, addr: SocketAddr) {
        let service = Arc::clone(&self.service);
        let game_tx = self.game_tx.clone();

        tokio::spawn(async move {
            let response = Self::handle_packet(&service, packet, addr).await;
            if let Err(e) = game_tx.send(GameMessage::SendPacket {
                packet: response,
                addr,
            }) {
                error!("Failed to queue response for {}: {}", addr, e);
            }
        });
    }

    /// Main server loop
    pub async fn run(&mut self) -> ServerResult<()> {
        self.spawn_network_receiver();
        self.spawn_network_sender();

        info!("Server started successfully");

        while let Some(message) = self.server_rx.recv().await {
            match message {
                ServerMessage::PacketReceived { packet, addr } => {
                    self.dispatch(packet, addr);
                }
                ServerMessage::Shutdown => {
                    info!("Server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
