use log::trace;

use crate::{
    error::{Error, Illegal},
    game::{
        action::{self, Action},
        component::{find_step, ActionKind, Tile, Unit},
        movement::{MovePoints, Path, Pathfinder},
        rules::{Rules, UnitStats},
        turn,
        Coins, PlayerId, Status, World,
    },
    map::{distance, AxialCoord},
};

pub fn check(
    world: &World,
    rules: &dyn Rules,
    player: PlayerId,
    action: &Action,
) -> Result<(), Error> {
    trace!("check: {:?}", action);
    check_turn(world, player)?;
    match *action {
        Action::Move(ref action) => check_move(world, rules, action).map(|_| ()),
        Action::Attack(ref action) => check_attack(world, rules, action).map(|_| ()),
        Action::Build(ref action) => check_build(world, rules, player, action).map(|_| ()),
        Action::Capture(ref action) => check_capture(world, rules, action).map(|_| ()),
        Action::EndTurn(_) => Ok(()),
    }
}

pub(super) struct MovePlan {
    pub previous: Unit,
    pub unit: Unit,
    pub path: Path,
    pub cost: MovePoints,
    pub step: usize,
}

pub(super) struct AttackPlan {
    pub previous_attacker: Unit,
    pub previous_defender: Unit,
    pub attacker: Unit,
    pub defender: Unit,
    pub step: usize,
}

pub(super) struct BuildPlan {
    pub stats: UnitStats,
    pub coins: Coins,
}

pub(super) struct CapturePlan {
    pub previous: Unit,
    pub unit: Unit,
    pub step: usize,
}

pub(super) fn check_turn(world: &World, player: PlayerId) -> Result<(), Error> {
    if world.status() == Status::Ended {
        return Err(Illegal::GameEnded.into());
    }
    if world.current_player() != player {
        return Err(Illegal::NotYourTurn.into());
    }
    Ok(())
}

fn check_unit_belongs_to_current_player(world: &World, unit: &Unit) -> Result<(), Error> {
    if unit.player != world.current_player() {
        return Err(Illegal::CanNotCommandEnemyUnits.into());
    }
    Ok(())
}

fn try_get_unit(world: &World, pos: AxialCoord) -> Result<&Unit, Error> {
    world.unit_at(pos).ok_or(Error::IllegalAction(Illegal::NoUnitAt(pos)))
}

fn top_up(world: &World, rules: &dyn Rules, unit: &Unit) -> Result<Unit, Error> {
    turn::top_up_unit(world, rules, unit, world.turn()).map_err(Error::into_illegal)
}

fn stats<'a>(rules: &'a dyn Rules, unit: &Unit) -> Result<&'a UnitStats, Error> {
    rules.unit_stats(unit.unit_type).map_err(Error::into_illegal)
}

fn check_step(stats: &UnitStats, unit: &Unit, kind: ActionKind) -> Result<usize, Error> {
    find_step(&stats.action_order, unit.progression_step, kind)
        .ok_or(Error::IllegalAction(Illegal::ActionOrder))
}

pub(super) fn check_move(
    world: &World,
    rules: &dyn Rules,
    action: &action::Move,
) -> Result<MovePlan, Error> {
    let previous = try_get_unit(world, action.from)?;
    check_unit_belongs_to_current_player(world, previous)?;
    if world.is_tile_occupied(action.to) {
        return Err(Illegal::TileOccupied(action.to).into());
    }
    let unit = top_up(world, rules, previous)?;
    let left = unit.move_points;
    if left <= MovePoints(0) {
        return Err(Illegal::NoMovePointsLeft.into());
    }
    let tile = world
        .tile(action.to)
        .ok_or(Illegal::NoTileAt(action.to))?;
    if rules.movement_cost(unit.unit_type, tile.terrain).is_err() {
        return Err(Illegal::ImpassableTerrain(action.to).into());
    }
    let step = check_step(stats(rules, &unit)?, &unit, ActionKind::Move)?;
    let mut pathfinder = Pathfinder::new();
    pathfinder.fill_map(world, rules, &unit);
    let path = pathfinder.path(action.to).ok_or(Error::PathNotFound {
        from: action.from,
        to: action.to,
    })?;
    let cost = path.cost_for(world, rules, unit.unit_type)?;
    if cost > left {
        return Err(Illegal::NotEnoughMovePoints { needed: cost, left }.into());
    }
    Ok(MovePlan {
        previous: previous.clone(),
        unit,
        path,
        cost,
        step,
    })
}

pub(super) fn check_attack(
    world: &World,
    rules: &dyn Rules,
    action: &action::Attack,
) -> Result<AttackPlan, Error> {
    let previous_attacker = try_get_unit(world, action.attacker)?;
    let previous_defender = try_get_unit(world, action.defender)?;
    check_unit_belongs_to_current_player(world, previous_attacker)?;
    if previous_attacker.player == previous_defender.player {
        return Err(Illegal::FriendlyTarget.into());
    }
    let attacker = top_up(world, rules, previous_attacker)?;
    let defender = top_up(world, rules, previous_defender)?;
    let attacker_stats = stats(rules, &attacker)?;
    if !rules.can_attack(&attacker, &defender) {
        let dist = distance(action.attacker, action.defender);
        let in_range =
            dist >= attacker_stats.min_attack_range && dist <= attacker_stats.attack_range;
        return Err(if in_range {
            Illegal::CanNotAttack.into()
        } else {
            Illegal::OutOfRange(dist).into()
        });
    }
    let step = check_step(attacker_stats, &attacker, ActionKind::Attack)?;
    Ok(AttackPlan {
        previous_attacker: previous_attacker.clone(),
        previous_defender: previous_defender.clone(),
        attacker,
        defender,
        step,
    })
}

pub(super) fn check_build(
    world: &World,
    rules: &dyn Rules,
    player: PlayerId,
    action: &action::Build,
) -> Result<BuildPlan, Error> {
    let tile: &Tile = world
        .tile(action.pos)
        .ok_or(Illegal::NoTileAt(action.pos))?;
    if tile.owner != player {
        return Err(Illegal::TileNotOwned(action.pos).into());
    }
    let terrain = rules
        .terrain_stats(tile.terrain)
        .map_err(Error::into_illegal)?;
    if !terrain.buildable.contains(&action.unit_type) {
        return Err(Illegal::NotBuildable(action.unit_type).into());
    }
    let tile = turn::top_up_tile(tile, world.turn());
    if tile.last_acted_turn == world.turn() {
        return Err(Illegal::AlreadyBuiltThisTurn(action.pos).into());
    }
    if tile.unit.is_some() {
        return Err(Illegal::TileOccupied(action.pos).into());
    }
    let stats = rules
        .unit_stats(action.unit_type)
        .map_err(Error::into_illegal)?;
    let coins = world.coins(player)?;
    if coins < stats.cost {
        return Err(Illegal::NotEnoughCoins {
            needed: stats.cost,
            available: coins,
        }
        .into());
    }
    Ok(BuildPlan {
        stats: stats.clone(),
        coins,
    })
}

pub(super) fn check_capture(
    world: &World,
    rules: &dyn Rules,
    action: &action::Capture,
) -> Result<CapturePlan, Error> {
    let previous = try_get_unit(world, action.pos)?;
    check_unit_belongs_to_current_player(world, previous)?;
    let tile = world
        .tile(action.pos)
        .ok_or(Illegal::NoTileAt(action.pos))?;
    if tile.owner == previous.player {
        return Err(Illegal::AlreadyOwned(action.pos).into());
    }
    let terrain = rules
        .terrain_stats(tile.terrain)
        .map_err(Error::into_illegal)?;
    if !terrain.capturable {
        return Err(Illegal::NotCapturable(action.pos).into());
    }
    let stats = stats(rules, previous)?;
    if !stats.can_capture {
        return Err(Illegal::CanNotCapture(previous.unit_type).into());
    }
    let unit = top_up(world, rules, previous)?;
    if unit.capture_started_turn.is_some() {
        return Err(Illegal::AlreadyCapturing.into());
    }
    let step = check_step(stats, &unit, ActionKind::Capture)?;
    Ok(CapturePlan {
        previous: previous.clone(),
        unit,
        step,
    })
}
