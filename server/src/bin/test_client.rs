use bincode::{deserialize, serialize};
use clap::Parser;
use log::{debug, info, warn};
use rand::Rng;
use shared::{Action, Direction, GameId, Packet, MAX_DATAGRAM_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

type ClientResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Plays a few random turns against a running server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Player name to register with
    #[arg(short, long, default_value = "tester")]
    name: String,

    /// Existing game to join; a new game is created when omitted
    #[arg(short, long)]
    game: Option<GameId>,

    /// Number of turns to play
    #[arg(short, long, default_value = "5")]
    rounds: u32,
}

async fn send(socket: &UdpSocket, server: SocketAddr, packet: &Packet) -> ClientResult<()> {
    let data = serialize(packet)?;
    socket.send_to(&data, server).await?;
    Ok(())
}

async fn recv(socket: &UdpSocket) -> ClientResult<Packet> {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    Ok(deserialize::<Packet>(&buf[0..len])?)
}

/// Counts round-ended pushes for the game being played
struct RoundCounter {
    game_id: Option<GameId>,
    ended: u32,
}

impl RoundCounter {
    fn record(&mut self, game_id: GameId, action: &str) {
        if self.game_id == Some(game_id) {
            info!("Game {}: {}", game_id, action);
            self.ended += 1;
        } else {
            debug!("Ignoring {} for game {}", action, game_id);
        }
    }
}

/// Sends a request and returns the first reply that isn't a push notification
async fn request(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: &Packet,
    rounds: &mut RoundCounter,
) -> ClientResult<Packet> {
    send(socket, server, packet).await?;
    loop {
        match recv(socket).await? {
            Packet::RoundEnded { game_id, action } => rounds.record(game_id, &action),
            reply => return Ok(reply),
        }
    }
}

fn random_action() -> Action {
    let mut rng = rand::thread_rng();
    let direction = match rng.gen_range(0..4) {
        0 => Direction::North,
        1 => Direction::South,
        2 => Direction::East,
        _ => Direction::West,
    };
    if rng.gen_bool(0.5) {
        Action::step(direction)
    } else {
        Action::shoot(direction)
    }
}

#[tokio::main]
async fn main() -> ClientResult<()> {
    env_logger::init();
    let args = Args::parse();

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let server: SocketAddr = args.server.parse()?;
    info!("Client socket bound to {}", socket.local_addr()?);

    let mut rounds = RoundCounter {
        game_id: args.game,
        ended: 0,
    };

    let player = match request(
        &socket,
        server,
        &Packet::RegisterPlayer { name: args.name },
        &mut rounds,
    )
    .await?
    {
        Packet::PlayerRegistered { player } => player,
        other => return Err(format!("Expected PlayerRegistered but got: {:?}", other).into()),
    };
    info!("Registered as player {}", player.id);

    let game_id = match args.game {
        Some(game_id) => game_id,
        None => match request(&socket, server, &Packet::CreateGame, &mut rounds).await? {
            Packet::GameState { game } => game.id,
            other => return Err(format!("Expected GameState but got: {:?}", other).into()),
        },
    };

    rounds.game_id = Some(game_id);

    let join = Packet::JoinGame {
        game_id,
        player_id: player.id,
    };
    match request(&socket, server, &join, &mut rounds).await? {
        Packet::GameState { game } => {
            info!("Joined game {} with {} players", game.id, game.players.len())
        }
        other => return Err(format!("Failed to join game {}: {:?}", game_id, other).into()),
    }

    for turn in 0..args.rounds {
        let action = random_action();
        info!("Turn {}: {:?} {:?}", turn + 1, action.kind, action.direction);

        let packet = Packet::SubmitMove {
            game_id,
            player_id: player.id,
            action,
            override_checks: false,
        };

        match request(&socket, server, &packet, &mut rounds).await? {
            Packet::GameState { game } => {
                if let Some(state) = game.player_states.get(player.id) {
                    info!(
                        "At {} with {} health, {} round(s) archived",
                        state.location,
                        state.health,
                        game.history.len()
                    );
                }
            }
            Packet::Error { kind, message } => warn!("Move rejected ({:?}): {}", kind, message),
            other => warn!("Unexpected reply: {:?}", other),
        }

        // Wait for the rest of the table before acting again
        while rounds.ended <= turn {
            match recv(&socket).await? {
                Packet::RoundEnded { game_id, action } => rounds.record(game_id, &action),
                other => warn!("Unexpected packet: {:?}", other),
            }
        }
    }

    info!("Test client finished");
    Ok(())
}
