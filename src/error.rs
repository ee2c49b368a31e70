use std::{error, fmt};

use crate::{
    game::{scenario, Coins, Missing, MovePoints, PlayerId, UnitType},
    map::{AxialCoord, Distance},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    IllegalAction(Illegal),
    PathNotFound { from: AxialCoord, to: AxialCoord },
    NotFound(Missing),
    UnrecognizedChange(String),
    InconsistentState(String),
    Persistence(String),
    BadRules(String),
    BadScenario(scenario::Error),
    BadCoordKey(String),
}

impl Error {
    /// Rules gaps are illegal actions for the resolver, not broken state.
    pub fn into_illegal(self) -> Self {
        match self {
            Error::NotFound(missing) => Error::IllegalAction(Illegal::NoRulesEntry(missing)),
            other => other,
        }
    }
}

impl From<Illegal> for Error {
    fn from(illegal: Illegal) -> Self {
        Error::IllegalAction(illegal)
    }
}

impl From<Missing> for Error {
    fn from(missing: Missing) -> Self {
        Error::NotFound(missing)
    }
}

impl From<scenario::Error> for Error {
    fn from(err: scenario::Error) -> Self {
        Error::BadScenario(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IllegalAction(illegal) => write!(f, "Illegal action: {:?}", illegal),
            Error::PathNotFound { from, to } => write!(f, "No path from {} to {}", from, to),
            Error::NotFound(missing) => write!(f, "Not found: {:?}", missing),
            Error::UnrecognizedChange(s) => write!(f, "Unrecognized change: {}", s),
            Error::InconsistentState(s) => write!(f, "Inconsistent state: {}", s),
            Error::Persistence(s) => write!(f, "Persistence error: {}", s),
            Error::BadRules(s) => write!(f, "Can't load rules: {}", s),
            Error::BadScenario(e) => write!(f, "Bad scenario: {:?}", e),
            Error::BadCoordKey(s) => write!(f, "Can't parse coordinate key '{}'", s),
        }
    }
}

impl error::Error for Error {}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Illegal {
    GameEnded,
    NotYourTurn,
    NoUnitAt(AxialCoord),
    NoTileAt(AxialCoord),
    CanNotCommandEnemyUnits,
    TileOccupied(AxialCoord),
    NoMovePointsLeft,
    ImpassableTerrain(AxialCoord),
    NotEnoughMovePoints { needed: MovePoints, left: MovePoints },
    FriendlyTarget,
    OutOfRange(Distance),
    CanNotAttack,
    /// The unit's action order doesn't allow this action anymore this turn.
    ActionOrder,
    TileNotOwned(AxialCoord),
    NotBuildable(UnitType),
    AlreadyBuiltThisTurn(AxialCoord),
    NotEnoughCoins { needed: Coins, available: Coins },
    AlreadyOwned(AxialCoord),
    NotCapturable(AxialCoord),
    CanNotCapture(UnitType),
    AlreadyCapturing,
    NotAPlayer(PlayerId),
    NoRulesEntry(Missing),
}
