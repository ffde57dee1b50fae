//! # Growth Arena Server Library
//!
//! This library provides the authoritative server implementation for the
//! real-time multiplayer growth arena. Clients submit movement intents; the
//! server owns the single source of truth for every entity's position and
//! size, resolves all consumption and collision events, and broadcasts the
//! resulting world state to every connected client at a fixed rate.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! The server runs the definitive version of the world. All growth,
//! absorption and respawn decisions are made here; clients only render the
//! snapshots they receive. There is no client prediction to reconcile
//! against: the snapshot is the game.
//!
//! ### Session Management
//! Handles the complete lifecycle of client connections including:
//! - Join handling and player creation
//! - Profile updates and movement intents
//! - Explicit leaves and silent-connection timeouts
//!
//! ### State Broadcasting
//! Every 50 ms tick the simulation advances first, then the complete
//! post-tick snapshot is broadcast to all connections, so clients always
//! observe a consistent world with no torn reads.
//!
//! ## Architecture Design
//!
//! ### Single-Writer World
//! All world mutations (joins, leaves, profile updates, movement and the
//! tick itself) execute on one task. Socket reads happen on a separate
//! receiver task that forwards decoded packets over a channel, so every
//! discrete mutation lands entirely between collision passes. Ticks are
//! serialized by construction: a tick that runs long delays the next one,
//! it is never run concurrently.
//!
//! ### UDP-Based Communication
//! Uses UDP sockets for low-latency communication. State updates are sent
//! every tick; a lost snapshot is simply superseded by the next one, so no
//! reliability layer is needed for them.
//!
//! ## Module Organization
//!
//! - [`spawn`] - entity factory: id issuance and randomized construction
//!   of growth orbs, speed pellets, observer pellets and players.
//! - [`game`] - the authoritative world state and the per-tick collision
//!   resolver (orbs, pellets, observers, then player-versus-player).
//! - [`client_manager`] - connection registry: address to player-id
//!   mapping, liveness tracking, timeout sweep, capacity enforcement.
//! - [`network`] - the session gateway and tick scheduler: UDP plumbing,
//!   packet dispatch, the 50 ms interval loop and snapshot broadcast.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 20 Hz tick rate, up to 32 concurrent clients
//!     let mut server = Server::new(
//!         "0.0.0.0:3000",
//!         Duration::from_millis(50),
//!         32
//!     ).await?;
//!
//!     // Runs the main loop: applies inbound joins/leaves/profile/movement
//!     // packets, advances the collision passes once per tick, and
//!     // broadcasts the post-tick snapshot to all connections.
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
pub mod spawn;
