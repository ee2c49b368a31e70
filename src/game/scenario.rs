use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{
    game::{
        component::{Tile, Unit},
        rules::Rules,
        Coins, PlayerId, TerrainType, Turn, UnitType, World,
    },
    map::{self, AxialCoord, Distance},
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExactTile {
    pub pos: AxialCoord,
    pub terrain: TerrainType,

    #[serde(default)]
    pub owner: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExactUnit {
    pub owner: PlayerId,
    pub unit_type: UnitType,
    pub pos: AxialCoord,
}

/// A hexagonal map of `default_terrain` with some exact tiles and units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Scenario {
    pub map_radius: Distance,
    pub players_count: i32,
    pub default_terrain: TerrainType,
    pub tiles: Vec<ExactTile>,
    pub units: Vec<ExactUnit>,
    pub coins: BTreeMap<PlayerId, Coins>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            map_radius: Distance(5),
            players_count: 2,
            default_terrain: TerrainType(1),
            tiles: Vec::new(),
            units: Vec::new(),
            coins: BTreeMap::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Error {
    NegativeRadius,
    UnsupportedPlayersCount(i32),
    PosOutsideOfMap(AxialCoord),
    UnitsShareTile(AxialCoord),
    BadOwner(PlayerId),
}

const ORIGIN: AxialCoord = AxialCoord::new(0, 0);

impl Scenario {
    fn is_player(&self, id: PlayerId) -> bool {
        id.0 >= 1 && id.0 <= self.players_count
    }

    fn check_pos(&self, pos: AxialCoord) -> Result<(), Error> {
        if map::distance(ORIGIN, pos) > self.map_radius {
            return Err(Error::PosOutsideOfMap(pos));
        }
        Ok(())
    }

    pub fn check(&self) -> Result<(), Error> {
        if self.map_radius < Distance(0) {
            return Err(Error::NegativeRadius);
        }
        if self.players_count < 1 {
            return Err(Error::UnsupportedPlayersCount(self.players_count));
        }
        for tile in &self.tiles {
            self.check_pos(tile.pos)?;
            if tile.owner != PlayerId::NEUTRAL && !self.is_player(tile.owner) {
                return Err(Error::BadOwner(tile.owner));
            }
        }
        let mut occupied = HashSet::new();
        for unit in &self.units {
            self.check_pos(unit.pos)?;
            if !self.is_player(unit.owner) {
                return Err(Error::BadOwner(unit.owner));
            }
            if !occupied.insert(unit.pos) {
                return Err(Error::UnitsShareTile(unit.pos));
            }
        }
        for &player in self.coins.keys() {
            if !self.is_player(player) {
                return Err(Error::BadOwner(player));
            }
        }
        Ok(())
    }

    /// Builds a world on its first turn with every unit ready to act.
    pub fn create_world(&self, rules: &dyn Rules) -> Result<World, crate::Error> {
        self.check()?;
        let mut world = World::new(self.players_count);
        for pos in map::range(ORIGIN, self.map_radius) {
            world.add_tile(Tile::new(pos, self.default_terrain, PlayerId::NEUTRAL));
        }
        for tile in &self.tiles {
            world.add_tile(Tile::new(tile.pos, tile.terrain, tile.owner));
        }
        for (&player, &coins) in &self.coins {
            world.set_coins(player, coins)?;
        }
        for exact in &self.units {
            let stats = rules.unit_stats(exact.unit_type)?;
            let unit = Unit {
                id: world.next_unit_id(),
                player: exact.owner,
                unit_type: exact.unit_type,
                pos: exact.pos,
                health: stats.health,
                move_points: stats.move_points,
                last_acted_turn: Turn(0),
                last_topped_up_turn: world.turn(),
                attack_history: Vec::new(),
                progression_step: 0,
                capture_started_turn: None,
            };
            world.add_unit(unit)?;
        }
        Ok(world)
    }
}
