use log::{debug, error, trace};

use crate::{
    error::Error,
    game::{
        action::{self, Action},
        change::{
            CaptureStarted, CoinsChanged, CoinsReason, UnitBuilt, UnitDamaged, UnitKilled,
            UnitMoved, WorldChange,
        },
        check::{self, AttackPlan},
        combat,
        component::{AttackRecord, Step, Unit},
        movement::MovePoints,
        rules::{Combat, Rules, UnitStats},
        turn,
        Coins, Health, PlayerId, World,
    },
    utils::{clamp_min, GameRng},
};

/// Resolves an action into the changes it causes.
///
/// The world is only read: apply the returned changes to commit them.
/// Combat rolls advance `rng`, so the order of calls matters for replay.
pub fn execute(
    world: &World,
    rules: &dyn Rules,
    rng: &mut GameRng,
    player: PlayerId,
    action: &Action,
) -> Result<Vec<WorldChange>, Error> {
    trace!("execute: {:?}", action);
    let result = check::check_turn(world, player).and_then(|()| match *action {
        Action::Move(ref action) => execute_move(world, rules, action),
        Action::Attack(ref action) => execute_attack(world, rules, rng, action),
        Action::Build(ref action) => execute_build(world, rules, player, action),
        Action::Capture(ref action) => execute_capture(world, rules, action),
        Action::EndTurn(_) => turn::next_turn(world, rules),
    });
    match result {
        Ok(changes) => {
            debug!("{:?} resolved into {} change(s)", action, changes.len());
            Ok(changes)
        }
        Err(err) => {
            error!("Check failed: {:?}", err);
            Err(err)
        }
    }
}

/// Moves the unit to the given action order step.
fn advance(unit: &mut Unit, stats: &UnitStats, step: usize) {
    let is_new_step = step != unit.progression_step;
    if is_new_step && stats.action_order.get(step) == Some(&Step::Retreat) {
        unit.move_points = stats.retreat_points;
    }
    unit.progression_step = step;
}

fn unit_stats<'a>(rules: &'a dyn Rules, unit: &Unit) -> Result<&'a UnitStats, Error> {
    rules.unit_stats(unit.unit_type).map_err(Error::into_illegal)
}

fn execute_move(
    world: &World,
    rules: &dyn Rules,
    action: &action::Move,
) -> Result<Vec<WorldChange>, Error> {
    let plan = check::check_move(world, rules, action)?;
    trace!("path: {:?}", plan.path.tiles());
    let stats = unit_stats(rules, &plan.unit)?;
    let mut updated = plan.unit;
    updated.pos = action.to;
    updated.capture_started_turn = None;
    updated.move_points = MovePoints(updated.move_points.0 - plan.cost.0);
    updated.last_acted_turn = world.turn();
    let step = if updated.move_points == MovePoints(0) {
        plan.step + 1
    } else {
        plan.step
    };
    advance(&mut updated, stats, step);
    let moved = UnitMoved {
        previous: plan.previous,
        updated,
    };
    Ok(vec![moved.into()])
}

fn roll_damage(
    rules: &dyn Rules,
    rng: &mut GameRng,
    attacker: &Unit,
    defender: &Unit,
) -> Result<Health, Error> {
    let combat = Combat {
        attacker: attacker.unit_type,
        defender: defender.unit_type,
        wound_bonus: combat::wound_bonus(defender, attacker.pos),
    };
    rules
        .combat_damage(&combat, rng)
        .map_err(Error::into_illegal)
}

fn damage(unit: &mut Unit, damage: Health) {
    unit.health = Health(clamp_min(unit.health.0 - damage.0, 0));
}

fn unit_change(previous: Unit, updated: Unit) -> WorldChange {
    if updated.health == Health(0) {
        UnitKilled { previous }.into()
    } else {
        UnitDamaged { previous, updated }.into()
    }
}

fn execute_attack(
    world: &World,
    rules: &dyn Rules,
    rng: &mut GameRng,
    action: &action::Attack,
) -> Result<Vec<WorldChange>, Error> {
    let AttackPlan {
        previous_attacker,
        previous_defender,
        mut attacker,
        mut defender,
        step,
    } = check::check_attack(world, rules, action)?;
    let stats = unit_stats(rules, &attacker)?;
    let turn = world.turn();
    let defender_damage = roll_damage(rules, rng, &attacker, &defender)?;
    damage(&mut defender, defender_damage);
    defender.attack_history.push(AttackRecord {
        from: attacker.pos,
        is_ranged: combat::is_ranged(attacker.pos, defender.pos),
        turn,
    });
    let mut attacker_damage = Health(0);
    if defender.health > Health(0) && rules.can_attack(&defender, &attacker) {
        attacker_damage = roll_damage(rules, rng, &defender, &attacker)?;
        damage(&mut attacker, attacker_damage);
    }
    debug!(
        "{:?} hits {:?} for {}, takes {} back",
        attacker.id, defender.id, defender_damage.0, attacker_damage.0
    );
    attacker.last_acted_turn = turn;
    advance(&mut attacker, stats, step + 1);
    Ok(vec![
        unit_change(previous_defender, defender),
        unit_change(previous_attacker, attacker),
    ])
}

fn execute_build(
    world: &World,
    rules: &dyn Rules,
    player: PlayerId,
    action: &action::Build,
) -> Result<Vec<WorldChange>, Error> {
    let plan = check::check_build(world, rules, player, action)?;
    let turn = world.turn();
    let unit = Unit {
        id: world.next_unit_id(),
        player,
        unit_type: action.unit_type,
        pos: action.pos,
        health: plan.stats.health,
        move_points: MovePoints(0),
        last_acted_turn: turn,
        last_topped_up_turn: turn,
        attack_history: Vec::new(),
        progression_step: plan.stats.action_order.len(),
        capture_started_turn: None,
    };
    let cost = plan.stats.cost;
    let built = UnitBuilt { unit, cost };
    let coins = CoinsChanged {
        player,
        previous: plan.coins,
        new: Coins(plan.coins.0 - cost.0),
        reason: CoinsReason::Build,
    };
    Ok(vec![built.into(), coins.into()])
}

fn execute_capture(
    world: &World,
    rules: &dyn Rules,
    action: &action::Capture,
) -> Result<Vec<WorldChange>, Error> {
    let plan = check::check_capture(world, rules, action)?;
    let stats = unit_stats(rules, &plan.unit)?;
    let mut updated = plan.unit;
    updated.capture_started_turn = Some(world.turn());
    updated.last_acted_turn = world.turn();
    advance(&mut updated, stats, plan.step + 1);
    let started = CaptureStarted {
        previous: plan.previous,
        updated,
    };
    Ok(vec![started.into()])
}
