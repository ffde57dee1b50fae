//! Entity factory: id issuance and randomized spawn construction

use rand::Rng;
use shared::{
    sphere_volume, Observer, Orb, Player, SpeedPellet, Vec3, OBJECT_SPAWN_EXTENT, ORB_COLORS,
    ORB_RADIUS_MAX, ORB_RADIUS_MIN, PELLET_RADIUS, PLAYER_SPAWN_EXTENT, SPEED_PELLET_BOOST,
};

/// Issues opaque string identifiers from a monotonic counter.
///
/// Every entity kind draws from the same counter, so an id is unique across
/// the whole world for its lifetime, not just within its collection.
#[derive(Debug)]
pub struct IdSource {
    next: u64,
}

impl IdSource {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn issue(&mut self, prefix: &str) -> String {
        let id = format!("{}-{}", prefix, self.next);
        self.next += 1;
        id
    }
}

impl Default for IdSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Uniform position inside a cube of the given side length, centered at the
/// origin.
pub fn random_position<R: Rng>(rng: &mut R, extent: f64) -> Vec3 {
    let half = extent / 2.0;
    Vec3 {
        x: rng.gen_range(-half..half),
        y: rng.gen_range(-half..half),
        z: rng.gen_range(-half..half),
    }
}

/// Constructs a growth orb with a uniform [10, 30) radius, derived volume,
/// and a palette color.
pub fn spawn_orb<R: Rng>(ids: &mut IdSource, rng: &mut R) -> Orb {
    let radius = rng.gen_range(ORB_RADIUS_MIN..ORB_RADIUS_MAX);
    Orb {
        id: ids.issue("orb"),
        position: random_position(rng, OBJECT_SPAWN_EXTENT),
        radius,
        volume: sphere_volume(radius),
        color: ORB_COLORS[rng.gen_range(0..ORB_COLORS.len())],
    }
}

/// Constructs a fixed-size speed pellet carrying the permanent boost.
pub fn spawn_speed_pellet<R: Rng>(ids: &mut IdSource, rng: &mut R) -> SpeedPellet {
    SpeedPellet {
        id: ids.issue("pellet"),
        position: random_position(rng, OBJECT_SPAWN_EXTENT),
        radius: PELLET_RADIUS,
        boost: SPEED_PELLET_BOOST,
    }
}

/// Constructs a fixed-size observer pellet.
pub fn spawn_observer<R: Rng>(ids: &mut IdSource, rng: &mut R) -> Observer {
    Observer {
        id: ids.issue("observer"),
        position: random_position(rng, OBJECT_SPAWN_EXTENT),
        radius: PELLET_RADIUS,
    }
}

/// Constructs a spawn-default player inside the player spawn cube.
pub fn spawn_player<R: Rng>(ids: &mut IdSource, rng: &mut R) -> Player {
    let id = ids.issue("player");
    Player::new(id, random_position(rng, PLAYER_SPAWN_EXTENT))
}
