use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    game::{component::Unit, Coins, PlayerId, Turn},
    map::AxialCoord,
};

/// One atomic, replayable mutation of a world.
///
/// Unit variants carry complete unit states so applying them is an overwrite.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, derive_more::From)]
pub enum WorldChange {
    UnitMoved(UnitMoved),
    UnitDamaged(UnitDamaged),
    UnitKilled(UnitKilled),
    UnitBuilt(UnitBuilt),
    CoinsChanged(CoinsChanged),
    PlayerChanged(PlayerChanged),
    CaptureStarted(CaptureStarted),
    TileCaptured(TileCaptured),
    GameEnded(GameEnded),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnitMoved {
    pub previous: Unit,
    pub updated: Unit,
}

/// Also emitted with zero damage: the attack history and
/// the action progression of both sides change anyway.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnitDamaged {
    pub previous: Unit,
    pub updated: Unit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnitKilled {
    pub previous: Unit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnitBuilt {
    pub unit: Unit,
    pub cost: Coins,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CoinsReason {
    Build,
    Income,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CoinsChanged {
    pub player: PlayerId,
    pub previous: Coins,
    pub new: Coins,
    pub reason: CoinsReason,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlayerChanged {
    pub previous_player: PlayerId,
    pub new_player: PlayerId,
    pub previous_turn: Turn,
    pub new_turn: Turn,

    /// Units refreshed for the new turn.
    pub reset_units: Vec<Unit>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CaptureStarted {
    pub previous: Unit,
    pub updated: Unit,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TileCaptured {
    pub pos: AxialCoord,
    pub previous_owner: PlayerId,
    pub new_owner: PlayerId,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GameEnded {
    pub winner: Option<PlayerId>,
}

impl WorldChange {
    /// A change that undoes this one, where the change carries enough data for that.
    pub fn inverse(&self) -> Option<WorldChange> {
        match self {
            WorldChange::UnitMoved(c) => Some(
                UnitMoved {
                    previous: c.updated.clone(),
                    updated: c.previous.clone(),
                }
                .into(),
            ),
            WorldChange::UnitDamaged(c) => Some(
                UnitDamaged {
                    previous: c.updated.clone(),
                    updated: c.previous.clone(),
                }
                .into(),
            ),
            WorldChange::CaptureStarted(c) => Some(
                CaptureStarted {
                    previous: c.updated.clone(),
                    updated: c.previous.clone(),
                }
                .into(),
            ),
            WorldChange::CoinsChanged(c) => Some(
                CoinsChanged {
                    player: c.player,
                    previous: c.new,
                    new: c.previous,
                    reason: c.reason,
                }
                .into(),
            ),
            WorldChange::TileCaptured(c) => Some(
                TileCaptured {
                    pos: c.pos,
                    previous_owner: c.new_owner,
                    new_owner: c.previous_owner,
                }
                .into(),
            ),
            WorldChange::UnitKilled(_)
            | WorldChange::UnitBuilt(_)
            | WorldChange::PlayerChanged(_)
            | WorldChange::GameEnded(_) => None,
        }
    }
}

pub fn encode_batch(changes: &[WorldChange]) -> Result<String, Error> {
    ron::ser::to_string(&changes).map_err(|err| Error::Persistence(err.to_string()))
}

/// Reads a batch from the wire. Unknown variants are reported as unrecognized.
pub fn decode_batch(s: &str) -> Result<Vec<WorldChange>, Error> {
    ron::de::from_str(s).map_err(|err| Error::UnrecognizedChange(err.to_string()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::Error,
        game::{Coins, PlayerId},
        map::AxialCoord,
    };

    use super::{
        decode_batch, encode_batch, CoinsChanged, CoinsReason, GameEnded, TileCaptured,
        WorldChange,
    };

    #[test]
    fn batch_goes_through_the_wire() {
        let changes: Vec<WorldChange> = vec![
            CoinsChanged {
                player: PlayerId(1),
                previous: Coins(500),
                new: Coins(425),
                reason: CoinsReason::Build,
            }
            .into(),
            GameEnded {
                winner: Some(PlayerId(1)),
            }
            .into(),
        ];
        let encoded = encode_batch(&changes).unwrap();
        assert_eq!(decode_batch(&encoded).unwrap(), changes);
    }

    #[test]
    fn unknown_variant_is_unrecognized() {
        let result = decode_batch("[UnitTeleported((id: 1))]");
        match result {
            Err(Error::UnrecognizedChange(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn inverse_of_inverse() {
        let change: WorldChange = TileCaptured {
            pos: AxialCoord::new(1, 2),
            previous_owner: PlayerId(0),
            new_owner: PlayerId(2),
        }
        .into();
        let inverse = change.inverse().unwrap();
        assert!(inverse != change);
        assert_eq!(inverse.inverse(), Some(change));
        let ended: WorldChange = GameEnded { winner: None }.into();
        assert_eq!(ended.inverse(), None);
    }
}
