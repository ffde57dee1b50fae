//! Authoritative world state and the per-tick collision resolver

use crate::spawn::{
    random_position, spawn_observer, spawn_orb, spawn_player, spawn_speed_pellet, IdSource,
};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    spheres_overlap, Observer, Orb, Player, SpeedPellet, Vec3, WorldSnapshot, ABSORB_MARGIN,
    DEFAULT_NAME, DEFAULT_SKIN, MIN_OBSERVERS, OBSERVER_VOLUME_BONUS, ORB_COUNT,
    PLAYER_SPAWN_EXTENT, SPEED_PELLET_COUNT,
};
use std::collections::HashMap;

/// The single source of truth for all entity state.
///
/// All mutations funnel through the methods below and are executed on one
/// task, so each join/leave/profile/movement update lands entirely between
/// collision passes, never in the middle of one.
#[derive(Debug)]
pub struct GameState {
    pub tick: u64,
    pub players: HashMap<String, Player>,
    pub orbs: Vec<Orb>,
    pub speed_pellets: Vec<SpeedPellet>,
    pub observers: Vec<Observer>,
    ids: IdSource,
    rng: StdRng,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_seed(rand::random())
    }

    /// Seeded constructor so simulation runs are reproducible in tests.
    pub fn with_seed(seed: u64) -> Self {
        let mut state = Self {
            tick: 0,
            players: HashMap::new(),
            orbs: Vec::with_capacity(ORB_COUNT),
            speed_pellets: Vec::with_capacity(SPEED_PELLET_COUNT),
            observers: Vec::with_capacity(MIN_OBSERVERS),
            ids: IdSource::new(),
            rng: StdRng::seed_from_u64(seed),
        };

        for _ in 0..ORB_COUNT {
            let orb = spawn_orb(&mut state.ids, &mut state.rng);
            state.orbs.push(orb);
        }
        for _ in 0..SPEED_PELLET_COUNT {
            let pellet = spawn_speed_pellet(&mut state.ids, &mut state.rng);
            state.speed_pellets.push(pellet);
        }
        while state.observers.len() < MIN_OBSERVERS {
            let observer = spawn_observer(&mut state.ids, &mut state.rng);
            state.observers.push(observer);
        }

        state
    }

    /// Creates a spawn-default player and returns its issued id.
    pub fn add_player(&mut self) -> String {
        let player = spawn_player(&mut self.ids, &mut self.rng);
        let id = player.id.clone();
        info!(
            "Added player {} at ({:.1}, {:.1}, {:.1})",
            id, player.position.x, player.position.y, player.position.z
        );
        self.players.insert(id.clone(), player);
        id
    }

    pub fn remove_player(&mut self, id: &str) {
        if self.players.remove(id).is_some() {
            info!("Removed player {}", id);
        }
    }

    /// Updates name and skin. Empty fields fall back to the defaults; an
    /// absent id is ignored since a disconnect may race a late profile
    /// update.
    pub fn set_profile(&mut self, id: &str, name: &str, skin: &str) {
        if let Some(player) = self.players.get_mut(id) {
            player.name = if name.is_empty() {
                DEFAULT_NAME.to_string()
            } else {
                name.to_string()
            };
            player.skin = if skin.is_empty() {
                DEFAULT_SKIN.to_string()
            } else {
                skin.to_string()
            };
        }
    }

    /// Applies a movement intent: `position += move_vector * speed * delta`
    /// component-wise. The vector and delta are taken as-is; the transport
    /// boundary is permissive and the server does not clamp either.
    pub fn apply_movement(&mut self, id: &str, move_vector: Vec3, delta: f64) {
        if let Some(player) = self.players.get_mut(id) {
            let step = player.speed * delta;
            player.position.x += move_vector.x * step;
            player.position.y += move_vector.y * step;
            player.position.z += move_vector.z * step;
        }
    }

    /// Full current state for broadcast.
    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            players: self.players.clone(),
            orbs: self.orbs.clone(),
            speed_pellets: self.speed_pellets.clone(),
            observers: self.observers.clone(),
        }
    }

    /// Advances the simulation by one tick.
    ///
    /// Pass order is fixed: orbs, speed pellets, observers, then
    /// player-versus-player. Reordering changes outcomes.
    pub fn run_tick(&mut self) {
        self.absorb_orbs();
        self.absorb_speed_pellets();
        self.absorb_observers();
        self.resolve_player_collisions();
        self.tick += 1;
    }

    /// Stable enumeration of currently connected player ids.
    fn roster(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.players.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Player-orb pass: an overlapped orb's volume is absorbed and the orb
    /// is replaced in place by a fresh spawn. The reverse index scan means
    /// a replacement is never re-checked against the same player, while
    /// remaining visible to players later in the roster.
    fn absorb_orbs(&mut self) {
        for id in self.roster() {
            let mut player = match self.players.get(&id) {
                Some(p) => p.clone(),
                None => continue,
            };

            for i in (0..self.orbs.len()).rev() {
                if spheres_overlap(
                    &player.position,
                    player.radius,
                    &self.orbs[i].position,
                    self.orbs[i].radius,
                ) {
                    player.absorb_volume(self.orbs[i].volume);
                    debug!("player {} absorbed {}", id, self.orbs[i].id);
                    self.orbs[i] = spawn_orb(&mut self.ids, &mut self.rng);
                }
            }

            self.players.insert(id, player);
        }
    }

    /// Player-pellet pass: an overlapped pellet permanently raises the
    /// player's speed and is replaced in place.
    fn absorb_speed_pellets(&mut self) {
        for id in self.roster() {
            let mut player = match self.players.get(&id) {
                Some(p) => p.clone(),
                None => continue,
            };

            for i in (0..self.speed_pellets.len()).rev() {
                if spheres_overlap(
                    &player.position,
                    player.radius,
                    &self.speed_pellets[i].position,
                    self.speed_pellets[i].radius,
                ) {
                    player.speed += self.speed_pellets[i].boost;
                    debug!("player {} absorbed {}", id, self.speed_pellets[i].id);
                    self.speed_pellets[i] = spawn_speed_pellet(&mut self.ids, &mut self.rng);
                }
            }

            self.players.insert(id, player);
        }
    }

    /// Player-observer pass: a fixed volume bonus per hit, replacement in
    /// place, then an unconditional top-up to the observer floor.
    fn absorb_observers(&mut self) {
        for id in self.roster() {
            let mut player = match self.players.get(&id) {
                Some(p) => p.clone(),
                None => continue,
            };

            for i in (0..self.observers.len()).rev() {
                if spheres_overlap(
                    &player.position,
                    player.radius,
                    &self.observers[i].position,
                    self.observers[i].radius,
                ) {
                    player.absorb_volume(OBSERVER_VOLUME_BONUS);
                    debug!("player {} absorbed {}", id, self.observers[i].id);
                    self.observers[i] = spawn_observer(&mut self.ids, &mut self.rng);
                }
            }

            self.players.insert(id, player);
        }

        while self.observers.len() < MIN_OBSERVERS {
            let observer = spawn_observer(&mut self.ids, &mut self.rng);
            self.observers.push(observer);
        }
    }

    /// Player-versus-player pass over every unordered pair, in sorted id
    /// order. A player respawned by an earlier pair is compared again with
    /// its reset size in later pairs within the same tick.
    fn resolve_player_collisions(&mut self) {
        let roster = self.roster();

        for i in 0..roster.len() {
            for j in (i + 1)..roster.len() {
                let (a, b) = match (self.players.get(&roster[i]), self.players.get(&roster[j])) {
                    (Some(a), Some(b)) => (a.clone(), b.clone()),
                    _ => continue,
                };

                if !spheres_overlap(&a.position, a.radius, &b.position, b.radius) {
                    continue;
                }

                if a.radius > b.radius * ABSORB_MARGIN {
                    self.absorb_player(&roster[i], &roster[j]);
                } else if b.radius > a.radius * ABSORB_MARGIN {
                    self.absorb_player(&roster[j], &roster[i]);
                }
                // Near-equal sizes pass through each other.
            }
        }
    }

    /// The winner takes the loser's volume; the loser is reset to spawn
    /// defaults at a fresh position instead of being removed.
    fn absorb_player(&mut self, winner_id: &str, loser_id: &str) {
        let loser_volume = match self.players.get(loser_id) {
            Some(p) => p.volume,
            None => return,
        };

        if let Some(winner) = self.players.get_mut(winner_id) {
            winner.absorb_volume(loser_volume);
        }

        let respawn_at = random_position(&mut self.rng, PLAYER_SPAWN_EXTENT);
        if let Some(loser) = self.players.get_mut(loser_id) {
            loser.respawn(respawn_at);
        }

        debug!("player {} absorbed player {}", winner_id, loser_id);
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
