use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::PI;

/// Side length of the cube world objects spawn in, centered at the origin.
pub const OBJECT_SPAWN_EXTENT: f64 = 4000.0;
/// Side length of the cube players spawn (and respawn) in.
pub const PLAYER_SPAWN_EXTENT: f64 = 1000.0;
pub const PLAYER_SPAWN_RADIUS: f64 = 60.0;
pub const PLAYER_SPAWN_SPEED: f64 = 300.0;
pub const ORB_RADIUS_MIN: f64 = 10.0;
pub const ORB_RADIUS_MAX: f64 = 30.0;
pub const PELLET_RADIUS: f64 = 20.0;
pub const SPEED_PELLET_BOOST: f64 = 50.0;
pub const OBSERVER_VOLUME_BONUS: f64 = 30.0;
/// The world is never left with fewer observer pellets than this.
pub const MIN_OBSERVERS: usize = 3;
/// A player only absorbs another when its radius exceeds the other's by
/// this factor. Near-equal overlaps are a no-op.
pub const ABSORB_MARGIN: f64 = 1.1;
pub const ORB_COUNT: usize = 100;
pub const SPEED_PELLET_COUNT: usize = 20;
pub const DEFAULT_NAME: &str = "Anonymous";
pub const DEFAULT_SKIN: &str = "1.jpg";
/// Cosmetic palette orbs are tinted from.
pub const ORB_COLORS: [u32; 5] = [0xff6b6b, 0xfeca57, 0x48dbfb, 0x1dd1a1, 0x5f27cd];

/// Volume of a sphere with the given radius.
pub fn sphere_volume(radius: f64) -> f64 {
    (4.0 / 3.0) * PI * radius.powi(3)
}

/// Inverts `sphere_volume`. Entity radii are always derived from volume
/// through this, never stored independently.
pub fn radius_from_volume(volume: f64) -> f64 {
    ((3.0 * volume) / (4.0 * PI)).cbrt()
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// True when two spheres overlap (strict inequality: touching is not a hit).
pub fn spheres_overlap(a_pos: &Vec3, a_radius: f64, b_pos: &Vec3, b_radius: f64) -> bool {
    a_pos.distance(b_pos) < a_radius + b_radius
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub position: Vec3,
    pub radius: f64,
    pub volume: f64,
    pub speed: f64,
    pub skin: String,
}

impl Player {
    /// Creates a player at the fixed spawn defaults.
    pub fn new(id: String, position: Vec3) -> Self {
        Self {
            id,
            name: DEFAULT_NAME.to_string(),
            position,
            radius: PLAYER_SPAWN_RADIUS,
            volume: sphere_volume(PLAYER_SPAWN_RADIUS),
            speed: PLAYER_SPAWN_SPEED,
            skin: DEFAULT_SKIN.to_string(),
        }
    }

    /// Adds absorbed volume and re-derives the radius from it.
    pub fn absorb_volume(&mut self, volume: f64) {
        self.volume += volume;
        self.radius = radius_from_volume(self.volume);
    }

    /// Resets size and speed to spawn defaults at a new position.
    /// Identity, name and skin survive the respawn.
    pub fn respawn(&mut self, position: Vec3) {
        self.position = position;
        self.radius = PLAYER_SPAWN_RADIUS;
        self.volume = sphere_volume(PLAYER_SPAWN_RADIUS);
        self.speed = PLAYER_SPAWN_SPEED;
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Orb {
    pub id: String,
    pub position: Vec3,
    pub radius: f64,
    pub volume: f64,
    pub color: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SpeedPellet {
    pub id: String,
    pub position: Vec3,
    pub radius: f64,
    pub boost: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Observer {
    pub id: String,
    pub position: Vec3,
    pub radius: f64,
}

/// Complete authoritative world state as delivered to clients.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WorldSnapshot {
    pub players: HashMap<String, Player>,
    pub orbs: Vec<Orb>,
    pub speed_pellets: Vec<SpeedPellet>,
    pub observers: Vec<Observer>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub enum Packet {
    // Client -> server
    Join,
    SetProfile {
        name: String,
        skin: String,
    },
    Move {
        move_vector: Vec3,
        delta: f64,
    },
    Leave,

    // Server -> client
    Welcome {
        player_id: String,
        state: WorldSnapshot,
    },
    State {
        tick: u64,
        timestamp: u64,
        state: WorldSnapshot,
    },
    Rejected {
        reason: String,
    },
}
