use log::{debug, info, warn};

use crate::{
    error::Error,
    game::{
        change::{CoinsChanged, CoinsReason, GameEnded, PlayerChanged, TileCaptured, WorldChange},
        component::{Tile, Unit},
        rules::{Rules, UnitStats},
        Coins, Health, Missing, PlayerId, Turn, World,
    },
    utils::clamp_min,
};

pub fn needs_top_up(unit: &Unit, turn: Turn) -> bool {
    unit.last_topped_up_turn < turn
}

/// Health restored by the tile the unit stands on.
///
/// Only a unit that sat out the previous turn heals, and never on
/// a tile owned by an enemy.
fn healing(world: &World, stats: &UnitStats, unit: &Unit, turn: Turn) -> Result<Health, Error> {
    let previous_turn = Turn(clamp_min(turn.0 - 1, 1));
    if unit.last_acted_turn >= previous_turn {
        return Ok(Health(0));
    }
    let tile = world
        .tile(unit.pos)
        .ok_or(Error::NotFound(Missing::Tile(unit.pos)))?;
    if tile.owner != PlayerId::NEUTRAL && tile.owner != unit.player {
        return Ok(Health(0));
    }
    let bonus = stats.healing.get(&tile.terrain).cloned().unwrap_or_default();
    let missing = clamp_min(stats.health.0 - unit.health.0, 0);
    Ok(Health(clamp_min(bonus.0, 0).min(missing)))
}

/// Returns the unit as it looks on `turn` once its per-turn state is refreshed.
///
/// Nothing is written to the world: the refreshed state travels
/// inside the change that first touches the unit. Pending captures
/// are left alone, see `complete_capture`.
pub fn top_up_unit(
    world: &World,
    rules: &dyn Rules,
    unit: &Unit,
    turn: Turn,
) -> Result<Unit, Error> {
    let mut unit = unit.clone();
    if !needs_top_up(&unit, turn) {
        return Ok(unit);
    }
    let stats = rules.unit_stats(unit.unit_type)?;
    let healed = healing(world, stats, &unit, turn)?;
    if healed > Health(0) {
        debug!("{:?} heals {}", unit.id, healed.0);
        unit.health = Health(unit.health.0 + healed.0);
    }
    unit.move_points = stats.move_points;
    unit.attack_history.clear();
    unit.progression_step = 0;
    unit.last_topped_up_turn = turn;
    Ok(unit)
}

/// Finishes a capture the unit started before `turn`.
///
/// Called only when the owner's turn begins, so a capture is never
/// completed while the opponent is still acting.
pub fn complete_capture(world: &World, unit: &mut Unit, turn: Turn) -> Option<TileCaptured> {
    match unit.capture_started_turn {
        Some(started) if started < turn => {}
        _ => return None,
    }
    unit.capture_started_turn = None;
    let tile = world.tile(unit.pos)?;
    if tile.owner == unit.player {
        return None;
    }
    Some(TileCaptured {
        pos: unit.pos,
        previous_owner: tile.owner,
        new_owner: unit.player,
    })
}

pub fn top_up_tile(tile: &Tile, turn: Turn) -> Tile {
    let mut tile = tile.clone();
    if tile.last_topped_up_turn < turn {
        tile.last_topped_up_turn = turn;
    }
    tile
}

pub fn income(world: &World, rules: &dyn Rules, player: PlayerId) -> Coins {
    let total = world
        .tiles()
        .filter(|tile| tile.owner == player)
        .filter_map(|tile| rules.terrain_stats(tile.terrain).ok())
        .map(|stats| stats.income.0)
        .sum();
    Coins(total)
}

/// The only player that still has units, if there's exactly one.
pub fn winner(world: &World) -> Option<PlayerId> {
    let mut alive = world
        .players()
        .filter(|&player| !world.player_unit_ids(player).is_empty());
    let first = alive.next()?;
    if alive.next().is_none() {
        Some(first)
    } else {
        None
    }
}

fn next_player(world: &World) -> (PlayerId, Turn) {
    let current = world.current_player();
    if current.0 >= world.players_count() {
        (PlayerId(1), Turn(world.turn().0 + 1))
    } else {
        (PlayerId(current.0 + 1), world.turn())
    }
}

pub fn next_turn(world: &World, rules: &dyn Rules) -> Result<Vec<WorldChange>, Error> {
    let outgoing = world.current_player();
    let previous_turn = world.turn();
    let mut changes = Vec::new();
    let income = income(world, rules, outgoing);
    if income > Coins(0) {
        let previous = world.coins(outgoing)?;
        let new = Coins(previous.0 + income.0);
        let change = CoinsChanged {
            player: outgoing,
            previous,
            new,
            reason: CoinsReason::Income,
        };
        changes.push(change.into());
    }
    let (new_player, new_turn) = next_player(world);
    let mut reset_units = Vec::new();
    for id in world.player_unit_ids(new_player) {
        let unit = world.unit(id).ok_or(Error::NotFound(Missing::Unit(id)))?;
        let mut refreshed = match top_up_unit(world, rules, unit, new_turn) {
            Ok(refreshed) => refreshed,
            Err(err) => {
                warn!("Can't top up {:?}: {}", id, err);
                continue;
            }
        };
        if let Some(captured) = complete_capture(world, &mut refreshed, new_turn) {
            info!("{:?} captured {}", captured.new_owner, captured.pos);
            changes.push(captured.into());
        }
        if refreshed != *unit {
            reset_units.push(refreshed);
        }
    }
    info!(
        "{:?} ends turn {}, {:?} starts turn {}",
        outgoing, previous_turn.0, new_player, new_turn.0
    );
    let player_changed = PlayerChanged {
        previous_player: outgoing,
        new_player,
        previous_turn,
        new_turn,
        reset_units,
    };
    changes.push(player_changed.into());
    if let Some(winner) = winner(world) {
        info!("{:?} won", winner);
        let ended = GameEnded {
            winner: Some(winner),
        };
        changes.push(ended.into());
    }
    Ok(changes)
}
