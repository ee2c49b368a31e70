use serde::{Deserialize, Serialize};

use crate::{
    game::{change::WorldChange, PlayerId, UnitType},
    map::AxialCoord,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, derive_more::From)]
pub enum Action {
    Move(Move),
    Attack(Attack),
    Build(Build),
    Capture(Capture),
    EndTurn(EndTurn),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Move {
    pub from: AxialCoord,
    pub to: AxialCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Attack {
    pub attacker: AxialCoord,
    pub defender: AxialCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Build {
    pub pos: AxialCoord,
    pub unit_type: UnitType,
}

/// Starts capturing the tile the unit stands on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Capture {
    pub pos: AxialCoord,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndTurn;

/// A resolved action: the unit of replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameMove {
    pub player: PlayerId,
    pub action: Action,
    pub changes: Vec<WorldChange>,
}
