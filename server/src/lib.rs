//! # Arena Game Server Library
//!
//! This library provides the authoritative server for the turn-based arena
//! game. Players join a game and submit one action per round, either a move
//! or a shot. Once every joined player has acted, the server resolves the
//! round: the shots fired are archived, everyone's turn flag is reset and
//! the players are told the turn has ended.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Turn Resolution
//! The rules live in the `shared` crate (`Game::validate_move`,
//! `Game::apply_move`, `Game::is_round_complete`, `Game::resolve_round`).
//! The server decides when they run and makes the results durable.
//!
//! ### Per-Game Serialization
//! Each game is guarded by its own lock. Join and move requests for one game
//! are applied one at a time as fetch → mutate → save, so a round can never
//! be judged complete on stale data and one request's save never clobbers
//! another's. Requests for different games run in parallel.
//!
//! ### Notification
//! After a resolved round is saved, a round-ended notification is queued
//! for every joined player's device. Delivery is best-effort and never
//! affects the outcome of the move that triggered it.
//!
//! ## Module Organization
//!
//! ### Service Module (`service`)
//! `GameService` exposes create, join, submit-move and lookup operations and
//! owns the per-game locks.
//!
//! ### Store Module (`store`)
//! The `SessionStore` trait and an in-memory implementation with a session
//! capacity limit.
//!
//! ### Directory Module (`directory`)
//! The `PlayerDirectory` trait for player lookup and registration.
//!
//! ### Notifier Module (`notifier`)
//! The fire-and-forget `Notifier` trait and a logging implementation.
//!
//! ### Network Module (`network`)
//! UDP transport: one bincode `Packet` per datagram, one task per request.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     // Bind to an address and allow up to 1024 concurrent games
//!     let mut server = Server::new("127.0.0.1:8080", 1024).await?;
//!
//!     // Runs until the process is stopped or a shutdown is requested
//!     // through `server.handle()`
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Known Gaps
//!
//! Bullets are archived but never tested against player locations, so
//! health never goes down. `Game::resolve_round` carries the hook where
//! damage would be applied.

pub mod directory;
pub mod error;
pub mod network;
pub mod notifier;
pub mod service;
pub mod store;
