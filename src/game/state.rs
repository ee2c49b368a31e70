use std::sync::Arc;

use log::{debug, info};

use crate::{
    error::Error,
    game::{
        action::{self, Action, GameMove},
        change::WorldChange,
        check,
        component::{find_step, ActionKind},
        execute::execute,
        movement::{MovePoints, Pathfinder},
        rules::Rules,
        session::{GameLogEntry, GameSession, SessionStatus, SessionStore},
        turn, world, Missing, PlayerId, SessionId, World,
    },
    map::AxialCoord,
    utils::GameRng,
};

#[derive(Debug)]
struct SessionLog {
    id: SessionId,
    store: Box<dyn SessionStore>,
    next_sequence: u64,
}

/// A running game: the authoritative world plus everything needed
/// to resolve actions against it.
#[derive(Debug)]
pub struct Game {
    world: World,
    rules: Arc<dyn Rules>,
    rng: GameRng,
    log: Option<SessionLog>,
}

impl Game {
    pub fn new(world: World, rules: Arc<dyn Rules>, seed: u64) -> Self {
        Self {
            world,
            rules,
            rng: GameRng::new(seed),
            log: None,
        }
    }

    /// Starts a session log from the current world.
    pub fn with_session_log(
        mut self,
        id: SessionId,
        mut store: Box<dyn SessionStore>,
    ) -> Result<Self, Error> {
        store.create(&GameSession::new(id, self.world.snapshot()))?;
        self.log = Some(SessionLog {
            id,
            store,
            next_sequence: 0,
        });
        Ok(self)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn rules(&self) -> &dyn Rules {
        &*self.rules
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.log.as_ref().map(|log| log.id)
    }

    pub fn session_store(&self) -> Option<&dyn SessionStore> {
        self.log.as_ref().map(|log| &*log.store)
    }

    pub fn check(&self, player: PlayerId, action: &Action) -> Result<(), Error> {
        check(&self.world, &*self.rules, player, action)
    }

    pub fn process_one(&mut self, player: PlayerId, action: Action) -> Result<GameMove, Error> {
        let mut moves = self.process(&[(player, action)])?;
        moves
            .pop()
            .ok_or_else(|| Error::InconsistentState("empty batch result".into()))
    }

    /// Resolves a batch of actions as one transaction.
    ///
    /// Every action sees the changes of the ones before it. If any
    /// action is rejected, neither the world nor the rng change.
    pub fn process(&mut self, moves: &[(PlayerId, Action)]) -> Result<Vec<GameMove>, Error> {
        let saved_rng = self.rng.clone();
        self.world.push();
        let mut resolved = Vec::with_capacity(moves.len());
        for (player, action) in moves {
            match self.resolve_on_top(*player, action) {
                Ok(changes) => resolved.push(GameMove {
                    player: *player,
                    action: action.clone(),
                    changes,
                }),
                Err(err) => {
                    debug!("Batch rejected at {:?}: {}", action, err);
                    self.world.pop();
                    self.rng = saved_rng;
                    return Err(err);
                }
            }
        }
        self.world.pop();
        if let Err(err) = self.commit_moves(&resolved) {
            panic!("Can't apply resolved batch: {}", err);
        }
        self.log_moves(&resolved)?;
        Ok(resolved)
    }

    fn resolve_on_top(
        &mut self,
        player: PlayerId,
        action: &Action,
    ) -> Result<Vec<WorldChange>, Error> {
        let changes = execute(&self.world, &*self.rules, &mut self.rng, player, action)?;
        world::apply(&mut self.world, &changes)?;
        Ok(changes)
    }

    /// Applies every move or none of them.
    fn commit_moves(&mut self, moves: &[GameMove]) -> Result<(), Error> {
        self.world.push();
        for game_move in moves {
            if let Err(err) = world::apply(&mut self.world, &game_move.changes) {
                debug!("Can't apply {:?}: {}", game_move.action, err);
                self.world.pop();
                return Err(err);
            }
        }
        self.world.commit();
        Ok(())
    }

    /// Applies already resolved moves, e.g. ones received from the
    /// authoritative peer, and appends them to the session log.
    ///
    /// The moves are applied as one batch: if any change refers to
    /// something the world doesn't have, nothing is applied and the
    /// error is returned. The world is updated even if logging fails.
    ///
    /// # Panics
    ///
    /// Panics on `Error::InconsistentState`: the world itself is broken.
    pub fn apply_changes(&mut self, moves: &[GameMove]) -> Result<(), Error> {
        match self.commit_moves(moves) {
            Err(Error::InconsistentState(s)) => panic!("Inconsistent world: {}", s),
            Err(err) => return Err(err),
            Ok(()) => {}
        }
        self.log_moves(moves)
    }

    fn log_moves(&mut self, moves: &[GameMove]) -> Result<(), Error> {
        let log = match self.log {
            Some(ref mut log) => log,
            None => return Ok(()),
        };
        for game_move in moves {
            let entry = GameLogEntry {
                sequence: log.next_sequence,
                player: game_move.player,
                action: game_move.action.clone(),
                changes: game_move.changes.clone(),
            };
            log.store.append(log.id, &entry)?;
            log.next_sequence += 1;
            let is_end = game_move
                .changes
                .iter()
                .any(|change| matches!(change, WorldChange::GameEnded(_)));
            if is_end {
                info!("Session {:?} completed", log.id);
                log.store.set_status(log.id, SessionStatus::Completed)?;
            }
        }
        Ok(())
    }

    /// Where the unit at `pos` can still move this turn.
    pub fn movement_options(
        &self,
        pos: AxialCoord,
    ) -> Result<Vec<(AxialCoord, MovePoints)>, Error> {
        let unit = self
            .world
            .unit_at(pos)
            .ok_or(Error::NotFound(Missing::UnitAt(pos)))?;
        let unit = turn::top_up_unit(&self.world, &*self.rules, unit, self.world.turn())?;
        let stats = self.rules.unit_stats(unit.unit_type)?;
        if find_step(&stats.action_order, unit.progression_step, ActionKind::Move).is_none() {
            return Ok(Vec::new());
        }
        let mut pathfinder = Pathfinder::new();
        pathfinder.fill_map(&self.world, &*self.rules, &unit);
        Ok(pathfinder.reachable(unit.move_points))
    }

    /// Enemy positions the unit at `pos` could attack right now.
    pub fn attack_options(&self, pos: AxialCoord) -> Vec<AxialCoord> {
        let mut targets: Vec<_> = self
            .world
            .units()
            .map(|unit| unit.pos)
            .filter(|&target| {
                let attack = action::Attack {
                    attacker: pos,
                    defender: target,
                };
                check::check_attack(&self.world, &*self.rules, &attack).is_ok()
            })
            .collect();
        targets.sort();
        targets
    }
}
