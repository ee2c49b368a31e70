use serde::{Deserialize, Serialize};

use crate::{
    game::{movement::MovePoints, Coins, Health, PlayerId, TerrainType, Turn, UnitId, UnitType},
    map::AxialCoord,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Tile {
    pub pos: AxialCoord,
    pub terrain: TerrainType,

    #[serde(default)]
    pub owner: PlayerId,

    /// The only unit standing here, if any.
    #[serde(default)]
    pub unit: Option<UnitId>,

    /// A unit was built on this tile during this turn.
    #[serde(default)]
    pub last_acted_turn: Turn,

    #[serde(default)]
    pub last_topped_up_turn: Turn,
}

impl Tile {
    pub fn new(pos: AxialCoord, terrain: TerrainType, owner: PlayerId) -> Self {
        Self {
            pos,
            terrain,
            owner,
            unit: None,
            last_acted_turn: Turn(0),
            last_topped_up_turn: Turn(0),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AttackRecord {
    pub from: AxialCoord,
    pub is_ranged: bool,
    pub turn: Turn,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    pub id: UnitId,
    pub player: PlayerId,
    pub unit_type: UnitType,
    pub pos: AxialCoord,
    pub health: Health,

    /// What's left of this turn's move points.
    pub move_points: MovePoints,

    pub last_acted_turn: Turn,
    pub last_topped_up_turn: Turn,

    /// Attacks received during the current turn.
    #[serde(default)]
    pub attack_history: Vec<AttackRecord>,

    /// Index into the unit type's action order.
    #[serde(default)]
    pub progression_step: usize,

    #[serde(default)]
    pub capture_started_turn: Option<Turn>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    pub coins: Coins,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Move,
    Attack,
    Capture,
}

/// One step of a unit's per-turn action order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Step {
    Move,
    Attack,
    Capture,
    AttackOrCapture,

    /// Moving again with the unit type's retreat points.
    Retreat,
}

impl Step {
    pub fn allows(self, kind: ActionKind) -> bool {
        match (self, kind) {
            (Step::Move, ActionKind::Move) | (Step::Retreat, ActionKind::Move) => true,
            (Step::Attack, ActionKind::Attack) | (Step::AttackOrCapture, ActionKind::Attack) => {
                true
            }
            (Step::Capture, ActionKind::Capture)
            | (Step::AttackOrCapture, ActionKind::Capture) => true,
            _ => false,
        }
    }
}

/// Index of the first step at or after `progression` that allows `kind`.
/// Steps that are skipped over are lost for this turn.
pub fn find_step(order: &[Step], progression: usize, kind: ActionKind) -> Option<usize> {
    order
        .iter()
        .enumerate()
        .skip(progression)
        .find(|(_, step)| step.allows(kind))
        .map(|(index, _)| index)
}
