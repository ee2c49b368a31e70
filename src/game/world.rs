use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zlayer::{Layer, Stacked};

use crate::{
    error::Error,
    game::{
        component::{PlayerState, Tile, Unit},
        Coins, Missing, PlayerId, Status, Turn, UnitId,
    },
    map::AxialCoord,
    utils::try_remove_item,
};

pub use self::apply::{apply, apply_atomic, apply_change};

mod apply;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TurnState {
    pub players_count: i32,
    pub current_player: PlayerId,
    pub turn: Turn,
    pub status: Status,
    pub winner: Option<PlayerId>,
    pub next_unit_id: UnitId,
}

/// A flat, serializable copy of a world.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorldSnapshot {
    pub turn: TurnState,
    pub players: BTreeMap<PlayerId, PlayerState>,

    #[serde(with = "crate::map::coord_map")]
    pub tiles: BTreeMap<AxialCoord, Tile>,

    pub units: Vec<Unit>,
}

/// Tiles, units and turn counters of one game.
///
/// Every part is layered: `push` starts a speculative layer,
/// `pop` throws it away and `commit` merges it into the parent.
#[derive(Clone, Debug)]
pub struct World {
    tiles: Layer<AxialCoord, Tile>,
    units: Layer<UnitId, Unit>,
    player_units: Layer<PlayerId, Vec<UnitId>>,
    players: Layer<PlayerId, PlayerState>,
    turn: Stacked<TurnState>,
}

impl World {
    pub fn new(players_count: i32) -> Self {
        assert!(players_count > 0, "a world needs at least one player");
        let mut players = Layer::new();
        for id in 1..=players_count {
            players.insert(PlayerId(id), PlayerState::default());
        }
        let turn = TurnState {
            players_count,
            current_player: PlayerId(1),
            turn: Turn(1),
            status: Status::Playing,
            winner: None,
            next_unit_id: UnitId(1),
        };
        Self {
            tiles: Layer::new(),
            units: Layer::new(),
            player_units: Layer::new(),
            players,
            turn: Stacked::new(turn),
        }
    }

    pub fn tile(&self, pos: AxialCoord) -> Option<&Tile> {
        self.tiles.get_opt(&pos)
    }

    pub fn tile_positions(&self) -> Vec<AxialCoord> {
        self.tiles.keys()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().map(|(_, tile)| tile)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get_opt(&id)
    }

    pub fn unit_at(&self, pos: AxialCoord) -> Option<&Unit> {
        let id = self.tile(pos)?.unit?;
        self.unit(id)
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().map(|(_, unit)| unit)
    }

    pub fn player_unit_ids(&self, player: PlayerId) -> Vec<UnitId> {
        self.player_units.get_opt(&player).cloned().unwrap_or_default()
    }

    pub fn is_tile_occupied(&self, pos: AxialCoord) -> bool {
        self.tile(pos).map_or(false, |tile| tile.unit.is_some())
    }

    pub fn turn_state(&self) -> &TurnState {
        self.turn.get()
    }

    pub fn players_count(&self) -> i32 {
        self.turn.get().players_count
    }

    pub fn players(&self) -> impl Iterator<Item = PlayerId> {
        (1..=self.players_count()).map(PlayerId)
    }

    pub fn current_player(&self) -> PlayerId {
        self.turn.get().current_player
    }

    pub fn turn(&self) -> Turn {
        self.turn.get().turn
    }

    pub fn status(&self) -> Status {
        self.turn.get().status
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.turn.get().winner
    }

    pub fn next_unit_id(&self) -> UnitId {
        self.turn.get().next_unit_id
    }

    pub fn coins(&self, player: PlayerId) -> Result<Coins, Error> {
        self.players
            .get_opt(&player)
            .map(|state| state.coins)
            .ok_or(Error::NotFound(Missing::Player(player)))
    }

    /// Number of speculative layers on top of the canonical state.
    pub fn depth(&self) -> usize {
        self.turn.depth()
    }

    pub fn push(&mut self) {
        self.tiles.push();
        self.units.push();
        self.player_units.push();
        self.players.push();
        self.turn.push();
    }

    pub fn pop(&mut self) -> bool {
        self.tiles.pop();
        self.units.pop();
        self.player_units.pop();
        self.players.pop();
        self.turn.pop()
    }

    pub fn commit(&mut self) -> bool {
        self.tiles.commit();
        self.units.commit();
        self.player_units.commit();
        self.players.commit();
        self.turn.commit()
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            turn: self.turn.get().clone(),
            players: self
                .players
                .iter()
                .map(|(id, state)| (id, state.clone()))
                .collect(),
            tiles: self
                .tiles
                .iter()
                .map(|(pos, tile)| (pos, tile.clone()))
                .collect(),
            units: self.units().cloned().collect(),
        }
    }

    pub fn from_snapshot(snapshot: &WorldSnapshot) -> Result<Self, Error> {
        let turn = &snapshot.turn;
        if turn.players_count < 1 {
            let s = format!("snapshot has {} players", turn.players_count);
            return Err(Error::InconsistentState(s));
        }
        if turn.current_player.0 < 1 || turn.current_player.0 > turn.players_count {
            let s = format!("{:?} isn't a player of the snapshot", turn.current_player);
            return Err(Error::InconsistentState(s));
        }
        let mut world = World::new(snapshot.turn.players_count);
        *world.turn.get_mut() = snapshot.turn.clone();
        for (&id, state) in &snapshot.players {
            world.players.insert(id, state.clone());
        }
        for tile in snapshot.tiles.values() {
            let mut tile = tile.clone();
            tile.unit = None;
            world.add_tile(tile);
        }
        for unit in &snapshot.units {
            world.put_unit(unit.clone())?;
        }
        for (pos, tile) in &snapshot.tiles {
            if world.tile(*pos).map(|t| t.unit) != Some(tile.unit) {
                let s = format!("tile {} doesn't match its unit list", pos);
                return Err(Error::InconsistentState(s));
            }
        }
        Ok(world)
    }

    /// Verifies tile occupants, unit positions and the player index agree.
    pub fn check_invariants(&self) -> Result<(), Error> {
        for unit in self.units() {
            let occupant = self.tile(unit.pos).and_then(|tile| tile.unit);
            if occupant != Some(unit.id) {
                let s = format!("unit {:?} isn't referenced by tile {}", unit.id, unit.pos);
                return Err(Error::InconsistentState(s));
            }
            if !self.player_unit_ids(unit.player).contains(&unit.id) {
                let s = format!("unit {:?} is missing from its player's list", unit.id);
                return Err(Error::InconsistentState(s));
            }
        }
        for tile in self.tiles() {
            if let Some(id) = tile.unit {
                if self.unit(id).map(|unit| unit.pos) != Some(tile.pos) {
                    let s = format!("tile {} references a unit that isn't there", tile.pos);
                    return Err(Error::InconsistentState(s));
                }
            }
        }
        Ok(())
    }

    pub fn add_tile(&mut self, tile: Tile) {
        self.tiles.insert(tile.pos, tile);
    }

    pub fn add_unit(&mut self, unit: Unit) -> Result<(), Error> {
        self.put_unit(unit)
    }

    pub fn set_coins(&mut self, player: PlayerId, coins: Coins) -> Result<(), Error> {
        let state = self
            .players
            .get_opt_mut(&player)
            .ok_or(Error::NotFound(Missing::Player(player)))?;
        state.coins = coins;
        Ok(())
    }
}

/// Mutators. Be careful with them!
impl World {
    /// Inserts or overwrites a unit, keeping tiles and the player index in sync.
    pub(crate) fn put_unit(&mut self, unit: Unit) -> Result<(), Error> {
        let tile = self
            .tile(unit.pos)
            .ok_or(Error::NotFound(Missing::Tile(unit.pos)))?;
        if let Some(occupant) = tile.unit {
            if occupant != unit.id {
                let s = format!("{:?} can't enter {}: {:?} is there", unit.id, unit.pos, occupant);
                return Err(Error::InconsistentState(s));
            }
        }
        if let Some(old) = self.unit(unit.id).cloned() {
            if old.pos != unit.pos {
                self.set_occupant(old.pos, None)?;
            }
            if old.player != unit.player {
                self.unlist_unit(old.player, old.id);
            }
        }
        self.set_occupant(unit.pos, Some(unit.id))?;
        self.list_unit(unit.player, unit.id);
        let next_unit_id = &mut self.turn.get_mut().next_unit_id;
        if unit.id.0 >= next_unit_id.0 {
            *next_unit_id = UnitId(unit.id.0 + 1);
        }
        self.units.insert(unit.id, unit);
        Ok(())
    }

    pub(crate) fn remove_unit(&mut self, id: UnitId) -> Result<Unit, Error> {
        let unit = self
            .units
            .remove(&id)
            .ok_or(Error::NotFound(Missing::Unit(id)))?;
        if self.tile(unit.pos).and_then(|tile| tile.unit) != Some(id) {
            let s = format!("{:?} isn't referenced by tile {}", id, unit.pos);
            return Err(Error::InconsistentState(s));
        }
        self.set_occupant(unit.pos, None)?;
        self.unlist_unit(unit.player, id);
        Ok(unit)
    }

    pub(crate) fn tile_mut(&mut self, pos: AxialCoord) -> Result<&mut Tile, Error> {
        self.tiles
            .get_opt_mut(&pos)
            .ok_or(Error::NotFound(Missing::Tile(pos)))
    }

    pub(crate) fn set_turn(&mut self, player: PlayerId, turn: Turn) {
        let state = self.turn.get_mut();
        state.current_player = player;
        state.turn = turn;
    }

    pub(crate) fn end(&mut self, winner: Option<PlayerId>) {
        let state = self.turn.get_mut();
        state.status = Status::Ended;
        state.winner = winner;
    }

    fn set_occupant(&mut self, pos: AxialCoord, id: Option<UnitId>) -> Result<(), Error> {
        self.tile_mut(pos)?.unit = id;
        Ok(())
    }

    fn list_unit(&mut self, player: PlayerId, id: UnitId) {
        match self.player_units.get_opt_mut(&player) {
            Some(ids) => {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            None => self.player_units.insert(player, vec![id]),
        }
    }

    fn unlist_unit(&mut self, player: PlayerId, id: UnitId) {
        if let Some(ids) = self.player_units.get_opt_mut(&player) {
            try_remove_item(ids, &id);
        }
    }
}
