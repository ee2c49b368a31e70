use log::trace;

use crate::{
    error::Error,
    game::{
        change::{
            CaptureStarted, CoinsChanged, GameEnded, PlayerChanged, TileCaptured, UnitBuilt,
            UnitDamaged, UnitKilled, UnitMoved, WorldChange,
        },
        component::Unit,
        Missing,
    },
};

use super::World;

/// Applies changes in order, stopping at the first failure.
///
/// Changes before the failed one stay applied. Use `apply_atomic`
/// when the whole batch must succeed or leave no trace.
pub fn apply(world: &mut World, changes: &[WorldChange]) -> Result<(), Error> {
    for change in changes {
        apply_change(world, change)?;
    }
    Ok(())
}

pub fn apply_atomic(world: &mut World, changes: &[WorldChange]) -> Result<(), Error> {
    world.push();
    match apply(world, changes) {
        Ok(()) => {
            world.commit();
            Ok(())
        }
        Err(err) => {
            world.pop();
            Err(err)
        }
    }
}

pub fn apply_change(world: &mut World, change: &WorldChange) -> Result<(), Error> {
    trace!("apply: {:?}", change);
    match *change {
        WorldChange::UnitMoved(ref change) => apply_unit_moved(world, change),
        WorldChange::UnitDamaged(ref change) => apply_unit_damaged(world, change),
        WorldChange::UnitKilled(ref change) => apply_unit_killed(world, change),
        WorldChange::UnitBuilt(ref change) => apply_unit_built(world, change),
        WorldChange::CoinsChanged(ref change) => apply_coins_changed(world, change),
        WorldChange::PlayerChanged(ref change) => apply_player_changed(world, change),
        WorldChange::CaptureStarted(ref change) => apply_capture_started(world, change),
        WorldChange::TileCaptured(ref change) => apply_tile_captured(world, change),
        WorldChange::GameEnded(ref change) => apply_game_ended(world, change),
    }
}

fn overwrite_unit(world: &mut World, unit: &Unit) -> Result<(), Error> {
    if world.unit(unit.id).is_none() {
        return Err(Error::NotFound(Missing::Unit(unit.id)));
    }
    world.put_unit(unit.clone())
}

fn apply_unit_moved(world: &mut World, change: &UnitMoved) -> Result<(), Error> {
    overwrite_unit(world, &change.updated)
}

fn apply_unit_damaged(world: &mut World, change: &UnitDamaged) -> Result<(), Error> {
    overwrite_unit(world, &change.updated)
}

fn apply_unit_killed(world: &mut World, change: &UnitKilled) -> Result<(), Error> {
    world.remove_unit(change.previous.id)?;
    Ok(())
}

fn apply_unit_built(world: &mut World, change: &UnitBuilt) -> Result<(), Error> {
    let unit = &change.unit;
    world.put_unit(unit.clone())?;
    let tile = world.tile_mut(unit.pos)?;
    tile.last_acted_turn = unit.last_acted_turn;
    tile.last_topped_up_turn = unit.last_topped_up_turn;
    Ok(())
}

fn apply_coins_changed(world: &mut World, change: &CoinsChanged) -> Result<(), Error> {
    world.set_coins(change.player, change.new)
}

fn apply_player_changed(world: &mut World, change: &PlayerChanged) -> Result<(), Error> {
    world.set_turn(change.new_player, change.new_turn);
    for unit in &change.reset_units {
        overwrite_unit(world, unit)?;
    }
    Ok(())
}

fn apply_capture_started(world: &mut World, change: &CaptureStarted) -> Result<(), Error> {
    overwrite_unit(world, &change.updated)
}

fn apply_tile_captured(world: &mut World, change: &TileCaptured) -> Result<(), Error> {
    world.tile_mut(change.pos)?.owner = change.new_owner;
    Ok(())
}

fn apply_game_ended(world: &mut World, change: &GameEnded) -> Result<(), Error> {
    world.end(change.winner);
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::Error,
        game::{
            change::{CoinsChanged, CoinsReason, UnitDamaged, UnitKilled, UnitMoved, WorldChange},
            component::{Tile, Unit},
            movement::MovePoints,
            Coins, Health, Missing, PlayerId, TerrainType, Turn, UnitId, UnitType, World,
        },
        map::{range, AxialCoord, Distance},
    };

    use super::{apply, apply_atomic};

    fn unit(id: i32, player: i32, pos: AxialCoord) -> Unit {
        Unit {
            id: UnitId(id),
            player: PlayerId(player),
            unit_type: UnitType(1),
            pos,
            health: Health(100),
            move_points: MovePoints(3),
            last_acted_turn: Turn(0),
            last_topped_up_turn: Turn(1),
            attack_history: Vec::new(),
            progression_step: 0,
            capture_started_turn: None,
        }
    }

    fn world() -> World {
        let mut world = World::new(2);
        for pos in range(AxialCoord::new(0, 0), Distance(2)) {
            world.add_tile(Tile::new(pos, TerrainType(1), PlayerId(0)));
        }
        world.add_unit(unit(1, 1, AxialCoord::new(0, 0))).unwrap();
        world.add_unit(unit(2, 2, AxialCoord::new(1, 0))).unwrap();
        world.set_coins(PlayerId(1), Coins(100)).unwrap();
        world
    }

    fn moved(id: i32, from: AxialCoord, to: AxialCoord) -> WorldChange {
        let previous = unit(id, 1, from);
        let mut updated = previous.clone();
        updated.pos = to;
        updated.move_points = MovePoints(1);
        UnitMoved { previous, updated }.into()
    }

    fn batch() -> Vec<WorldChange> {
        let mut damaged = unit(2, 2, AxialCoord::new(1, 0));
        damaged.health = Health(30);
        vec![
            moved(1, AxialCoord::new(0, 0), AxialCoord::new(-1, 1)),
            UnitDamaged {
                previous: unit(2, 2, AxialCoord::new(1, 0)),
                updated: damaged,
            }
            .into(),
            CoinsChanged {
                player: PlayerId(1),
                previous: Coins(100),
                new: Coins(40),
                reason: CoinsReason::Build,
            }
            .into(),
        ]
    }

    #[test]
    fn same_batch_same_result() {
        let mut a = world();
        let mut b = world();
        apply(&mut a, &batch()).unwrap();
        apply(&mut b, &batch()).unwrap();
        assert_eq!(a.snapshot(), b.snapshot());
        a.check_invariants().unwrap();
        assert!(!a.is_tile_occupied(AxialCoord::new(0, 0)));
        assert_eq!(a.unit_at(AxialCoord::new(-1, 1)).map(|u| u.id), Some(UnitId(1)));
        assert_eq!(a.unit(UnitId(2)).unwrap().health, Health(30));
        assert_eq!(a.coins(PlayerId(1)), Ok(Coins(40)));
    }

    #[test]
    fn reapplying_converges() {
        let mut once = world();
        apply(&mut once, &batch()).unwrap();
        let mut twice = once.clone();
        apply(&mut twice, &batch()).unwrap();
        assert_eq!(once.snapshot(), twice.snapshot());
    }

    #[test]
    fn missing_unit_aborts_the_rest() {
        let mut world = world();
        let ghost = unit(9, 1, AxialCoord::new(2, 0));
        let changes = vec![
            moved(1, AxialCoord::new(0, 0), AxialCoord::new(-1, 1)),
            UnitKilled { previous: ghost }.into(),
            moved(1, AxialCoord::new(-1, 1), AxialCoord::new(-2, 2)),
        ];
        let result = apply(&mut world, &changes);
        assert_eq!(result, Err(Error::NotFound(Missing::Unit(UnitId(9)))));
        assert_eq!(world.unit(UnitId(1)).unwrap().pos, AxialCoord::new(-1, 1));
    }

    #[test]
    fn atomic_apply_leaves_no_trace() {
        let mut world = world();
        let before = world.snapshot();
        let changes = vec![
            moved(1, AxialCoord::new(0, 0), AxialCoord::new(-1, 1)),
            UnitKilled {
                previous: unit(9, 1, AxialCoord::new(2, 0)),
            }
            .into(),
        ];
        assert!(apply_atomic(&mut world, &changes).is_err());
        assert_eq!(world.depth(), 0);
        assert_eq!(world.snapshot(), before);
        apply_atomic(&mut world, &batch()).unwrap();
        assert_eq!(world.depth(), 0);
        assert_eq!(world.coins(PlayerId(1)), Ok(Coins(40)));
    }

    #[test]
    fn moving_into_another_unit_is_inconsistent() {
        let mut world = world();
        let change = moved(1, AxialCoord::new(0, 0), AxialCoord::new(1, 0));
        match apply(&mut world, &[change]) {
            Err(Error::InconsistentState(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn snapshot_round_trip() {
        let mut world = world();
        apply(&mut world, &batch()).unwrap();
        let snapshot = world.snapshot();
        let text = ron::ser::to_string(&snapshot).unwrap();
        assert!(text.contains("\"-1,1\""));
        let restored = World::from_snapshot(&ron::de::from_str(&text).unwrap()).unwrap();
        assert_eq!(restored.snapshot(), snapshot);
        restored.check_invariants().unwrap();
    }

    #[test]
    fn snapshot_without_players_is_rejected() {
        let mut snapshot = world().snapshot();
        snapshot.turn.players_count = 0;
        assert!(matches!(
            World::from_snapshot(&snapshot),
            Err(Error::InconsistentState(_))
        ));
        let mut snapshot = world().snapshot();
        snapshot.turn.current_player = PlayerId(3);
        assert!(matches!(
            World::from_snapshot(&snapshot),
            Err(Error::InconsistentState(_))
        ));
    }

    #[test]
    fn pushed_layer_is_isolated() {
        let mut world = world();
        let before = world.snapshot();
        world.push();
        apply(&mut world, &batch()).unwrap();
        world.remove_unit(UnitId(2)).unwrap();
        assert_eq!(world.units().count(), 1);
        assert!(world.pop());
        assert_eq!(world.snapshot(), before);
        world.check_invariants().unwrap();
    }
}
