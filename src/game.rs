use serde::{Deserialize, Serialize};

use crate::map::AxialCoord;

pub use crate::game::{
    action::{Action, GameMove},
    change::WorldChange,
    check::check,
    execute::execute,
    movement::MovePoints,
    rules::{Rules, TableRules},
    state::Game,
    world::World,
};

pub mod action;
pub mod change;
pub mod combat;
pub mod component;
pub mod execute;
pub mod movement;
pub mod rules;
pub mod scenario;
pub mod session;
pub mod state;
pub mod turn;
pub mod world;

mod check;


/// Player `0` is the neutral owner of unclaimed tiles.
#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct PlayerId(pub i32);

impl PlayerId {
    pub const NEUTRAL: PlayerId = PlayerId(0);
}

#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct UnitId(pub i32);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct UnitType(pub i32);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct TerrainType(pub i32);

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Health(pub i32);

#[derive(Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct Coins(pub i32);

/// Turns are counted from `1` and increase once every player had a go.
#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct Turn(pub i32);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionId(pub u64);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Playing,
    Ended,
}

/// What a lookup failed to find.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub enum Missing {
    Unit(UnitId),
    UnitAt(AxialCoord),
    Tile(AxialCoord),
    Player(PlayerId),
    UnitType(UnitType),
    Terrain(TerrainType),
    MovementCost {
        unit_type: UnitType,
        terrain: TerrainType,
    },
    Damage {
        attacker: UnitType,
        defender: UnitType,
    },
    Session(SessionId),
}
