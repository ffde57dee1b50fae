//! Connection registry for the session gateway
//!
//! Maps network addresses to the player ids issued by the world, tracks
//! per-connection liveness, and enforces the server's capacity limit. UDP
//! has no disconnect event, so connections that go silent are swept by a
//! periodic timeout check and treated exactly like an explicit leave.

use log::info;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Connections silent for longer than this are dropped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client: the address packets arrive from and the player the
/// world created for it.
#[derive(Debug)]
pub struct Client {
    pub player_id: String,
    pub addr: SocketAddr,
    /// Last time any packet arrived from this address.
    pub last_seen: Instant,
}

impl Client {
    pub fn new(player_id: String, addr: SocketAddr) -> Self {
        Self {
            player_id,
            addr,
            last_seen: Instant::now(),
        }
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Tracks all connected clients, keyed by player id.
///
/// The manager never touches world state itself; the gateway pairs every
/// registry change with the matching `add_player`/`remove_player` call so
/// the two stay in lockstep.
pub struct ClientManager {
    clients: HashMap<String, Client>,
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            max_clients,
        }
    }

    /// True when another join would exceed the capacity limit.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.max_clients
    }

    /// Registers a connection under the player id the world issued for it.
    pub fn register(&mut self, player_id: String, addr: SocketAddr) {
        info!("Client {} connected from {}", player_id, addr);
        self.clients
            .insert(player_id.clone(), Client::new(player_id, addr));
    }

    /// Removes a connection. Returns false if it was already gone, which
    /// happens when an explicit leave races the timeout sweep.
    pub fn remove_client(&mut self, player_id: &str) -> bool {
        if let Some(client) = self.clients.remove(player_id) {
            info!("Client {} disconnected", client.player_id);
            true
        } else {
            false
        }
    }

    /// Resolves the sender address of an incoming packet to a player id.
    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<String> {
        self.clients
            .values()
            .find(|client| client.addr == addr)
            .map(|client| client.player_id.clone())
    }

    /// Refreshes the liveness timestamp for a connection.
    pub fn touch(&mut self, player_id: &str) {
        if let Some(client) = self.clients.get_mut(player_id) {
            client.last_seen = Instant::now();
        }
    }

    /// Removes every connection past the timeout and returns their player
    /// ids so the gateway can retire the matching world entries.
    pub fn check_timeouts(&mut self) -> Vec<String> {
        let timed_out: Vec<String> = self
            .clients
            .values()
            .filter(|client| client.is_timed_out(CLIENT_TIMEOUT))
            .map(|client| client.player_id.clone())
            .collect();

        for player_id in &timed_out {
            self.remove_client(player_id);
        }

        timed_out
    }

    /// All connection endpoints, for broadcasting the tick snapshot.
    pub fn client_addrs(&self) -> Vec<(String, SocketAddr)> {
        self.clients
            .values()
            .map(|client| (client.player_id.clone(), client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client = Client::new("player-1".to_string(), test_addr());
        assert_eq!(client.player_id, "player-1");
        assert_eq!(client.addr, test_addr());
        assert!(!client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new("player-1".to_string(), test_addr());
        client.last_seen = Instant::now() - Duration::from_secs(10);
        assert!(client.is_timed_out(CLIENT_TIMEOUT));
    }

    #[test]
    fn test_register_and_remove() {
        let mut manager = ClientManager::new(4);
        assert!(manager.is_empty());

        manager.register("player-1".to_string(), test_addr());
        assert_eq!(manager.len(), 1);

        assert!(manager.remove_client("player-1"));
        assert!(manager.is_empty());
        assert!(!manager.remove_client("player-1"));
    }

    #[test]
    fn test_capacity_limit() {
        let mut manager = ClientManager::new(1);
        assert!(!manager.is_full());

        manager.register("player-1".to_string(), test_addr());
        assert!(manager.is_full());

        manager.remove_client("player-1");
        assert!(!manager.is_full());
    }

    #[test]
    fn test_find_by_addr() {
        let mut manager = ClientManager::new(4);
        manager.register("player-1".to_string(), test_addr());
        manager.register("player-2".to_string(), test_addr2());

        assert_eq!(manager.find_by_addr(test_addr()), Some("player-1".to_string()));
        assert_eq!(manager.find_by_addr(test_addr2()), Some("player-2".to_string()));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_by_addr(unknown), None);
    }

    #[test]
    fn test_touch_keeps_connection_alive() {
        let mut manager = ClientManager::new(4);
        manager.register("player-1".to_string(), test_addr());
        manager
            .clients
            .get_mut("player-1")
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(10);

        manager.touch("player-1");
        assert!(manager.check_timeouts().is_empty());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_check_timeouts_sweeps_silent_connections() {
        let mut manager = ClientManager::new(4);
        manager.register("player-1".to_string(), test_addr());
        manager.register("player-2".to_string(), test_addr2());
        manager
            .clients
            .get_mut("player-1")
            .unwrap()
            .last_seen = Instant::now() - Duration::from_secs(10);

        let timed_out = manager.check_timeouts();
        assert_eq!(timed_out, vec!["player-1".to_string()]);
        assert_eq!(manager.len(), 1);
        assert!(manager.find_by_addr(test_addr()).is_none());
    }

    #[test]
    fn test_client_addrs_for_broadcast() {
        let mut manager = ClientManager::new(4);
        manager.register("player-1".to_string(), test_addr());
        manager.register("player-2".to_string(), test_addr2());

        let mut addrs = manager.client_addrs();
        addrs.sort();
        assert_eq!(
            addrs,
            vec![
                ("player-1".to_string(), test_addr()),
                ("player-2".to_string(), test_addr2()),
            ]
        );
    }
}
