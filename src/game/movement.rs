use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    slice::Windows,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    game::{component::Unit, rules::Rules, Missing, UnitType, World},
    map::{dirs, AxialCoord, Dir},
};

#[derive(
    Serialize, Deserialize, Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct MovePoints(pub i32);

#[derive(Clone, Copy, Debug)]
pub struct Tile {
    cost: MovePoints,
    parent_dir: Option<Dir>,
}

impl Tile {
    pub fn parent(self) -> Option<Dir> {
        self.parent_dir
    }

    pub fn cost(self) -> MovePoints {
        self.cost
    }
}

/// Cost of entering `pos` for the given unit type.
pub fn tile_cost(
    world: &World,
    rules: &dyn Rules,
    unit_type: UnitType,
    pos: AxialCoord,
) -> Result<MovePoints, Error> {
    let tile = world.tile(pos).ok_or(Error::NotFound(Missing::Tile(pos)))?;
    rules.movement_cost(unit_type, tile.terrain)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Path {
    tiles: Vec<AxialCoord>,
}

impl Path {
    pub fn new(tiles: Vec<AxialCoord>) -> Self {
        assert!(!tiles.is_empty());
        Self { tiles }
    }

    pub fn tiles(&self) -> &[AxialCoord] {
        &self.tiles
    }

    pub fn from(&self) -> AxialCoord {
        self.tiles[0]
    }

    pub fn to(&self) -> AxialCoord {
        self.tiles[self.tiles.len() - 1]
    }

    pub fn cost_for(
        &self,
        world: &World,
        rules: &dyn Rules,
        unit_type: UnitType,
    ) -> Result<MovePoints, Error> {
        let mut cost = MovePoints(0);
        for step in self.steps() {
            cost.0 += tile_cost(world, rules, unit_type, step.to)?.0;
        }
        Ok(cost)
    }

    pub fn steps(&self) -> Steps {
        Steps {
            windows: self.tiles.windows(2),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Step {
    pub from: AxialCoord,
    pub to: AxialCoord,
}

#[derive(Clone, Debug)]
pub struct Steps<'a> {
    windows: Windows<'a, AxialCoord>,
}

impl<'a> Iterator for Steps<'a> {
    type Item = Step;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some([from, to]) = self.windows.next() {
            Some(Step {
                from: *from,
                to: *to,
            })
        } else {
            None
        }
    }
}

/// Dijkstra over the tiles of a world.
///
/// Occupied tiles and terrain without a movement cost are impassable.
#[derive(Clone, Debug, Default)]
pub struct Pathfinder {
    queue: BinaryHeap<Reverse<(MovePoints, AxialCoord)>>,
    map: HashMap<AxialCoord, Tile>,
}

impl Pathfinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&self) -> &HashMap<AxialCoord, Tile> {
        &self.map
    }

    fn is_passable(world: &World, pos: AxialCoord) -> bool {
        match world.tile(pos) {
            Some(tile) => tile.unit.is_none(),
            None => false,
        }
    }

    fn process_neighbor_pos(
        &mut self,
        world: &World,
        rules: &dyn Rules,
        unit_type: UnitType,
        original_pos: AxialCoord,
        neighbor_pos: AxialCoord,
    ) {
        let old_cost = match self.map.get(&original_pos) {
            Some(tile) => tile.cost,
            None => return,
        };
        let step_cost = match tile_cost(world, rules, unit_type, neighbor_pos) {
            Ok(cost) => cost,
            Err(_) => return,
        };
        let new_cost = MovePoints(old_cost.0 + step_cost.0);
        let is_better = self
            .map
            .get(&neighbor_pos)
            .map_or(true, |tile| tile.cost > new_cost);
        if is_better {
            let tile = Tile {
                cost: new_cost,
                parent_dir: Dir::get_dir_from_to(neighbor_pos, original_pos),
            };
            self.map.insert(neighbor_pos, tile);
            self.queue.push(Reverse((new_cost, neighbor_pos)));
        }
    }

    pub fn fill_map(&mut self, world: &World, rules: &dyn Rules, unit: &Unit) {
        self.map.clear();
        self.queue.clear();
        let start_tile = Tile {
            cost: MovePoints(0),
            parent_dir: None,
        };
        self.map.insert(unit.pos, start_tile);
        self.queue.push(Reverse((MovePoints(0), unit.pos)));
        while let Some(Reverse((cost, pos))) = self.queue.pop() {
            let is_stale = self.map.get(&pos).map_or(true, |tile| tile.cost < cost);
            if is_stale {
                continue;
            }
            for dir in dirs() {
                let neighbor_pos = Dir::get_neighbor_pos(pos, dir);
                if Self::is_passable(world, neighbor_pos) {
                    self.process_neighbor_pos(world, rules, unit.unit_type, pos, neighbor_pos);
                }
            }
        }
    }

    pub fn cost(&self, destination: AxialCoord) -> Option<MovePoints> {
        self.map.get(&destination).map(|tile| tile.cost)
    }

    pub fn path(&self, destination: AxialCoord) -> Option<Path> {
        let mut tile = *self.map.get(&destination)?;
        let mut path = vec![destination];
        let mut pos = destination;
        while let Some(parent_dir) = tile.parent() {
            pos = Dir::get_neighbor_pos(pos, parent_dir);
            tile = *self.map.get(&pos)?;
            path.push(pos);
        }
        path.reverse();
        Some(Path::new(path))
    }

    /// Every reached position, except the start, that fits into `budget`.
    pub fn reachable(&self, budget: MovePoints) -> Vec<(AxialCoord, MovePoints)> {
        let mut positions: Vec<_> = self
            .map
            .iter()
            .filter(|(_, tile)| tile.parent_dir.is_some() && tile.cost <= budget)
            .map(|(&pos, tile)| (pos, tile.cost))
            .collect();
        positions.sort();
        positions
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        game::{
            component::{Tile, Unit},
            rules::{TableRules, TerrainStats, UnitStats},
            Health, PlayerId, TerrainType, Turn, UnitId, UnitType, World,
        },
        map::{range, AxialCoord, Distance},
    };

    use super::{MovePoints, Path, Pathfinder, Step};

    const NODE_0: AxialCoord = AxialCoord::new(0, 1);
    const NODE_1: AxialCoord = AxialCoord::new(1, 0);
    const NODE_2: AxialCoord = AxialCoord::new(2, 0);

    const SCOUT: UnitType = UnitType(1);
    const PLAIN: TerrainType = TerrainType(1);
    const SWAMP: TerrainType = TerrainType(2);
    const LAVA: TerrainType = TerrainType(3);

    fn rules() -> TableRules {
        let terrain = |name: &str| TerrainStats {
            name: name.into(),
            buildable: Vec::new(),
            capturable: false,
            income: Default::default(),
        };
        let scout = UnitStats {
            name: "scout".into(),
            health: Health(10),
            move_points: MovePoints(4),
            attack_range: Distance(1),
            min_attack_range: Distance(1),
            cost: Default::default(),
            can_capture: false,
            retreat_points: MovePoints(0),
            action_order: Vec::new(),
            terrain_costs: vec![(PLAIN, MovePoints(1)), (SWAMP, MovePoints(3))]
                .into_iter()
                .collect(),
            healing: Default::default(),
        };
        TableRules::new()
            .with_unit(SCOUT, scout)
            .with_terrain(PLAIN, terrain("plain"))
            .with_terrain(SWAMP, terrain("swamp"))
            .with_terrain(LAVA, terrain("lava"))
    }

    fn scout(id: i32, pos: AxialCoord) -> Unit {
        Unit {
            id: UnitId(id),
            player: PlayerId(1),
            unit_type: SCOUT,
            pos,
            health: Health(10),
            move_points: MovePoints(4),
            last_acted_turn: Turn(0),
            last_topped_up_turn: Turn(1),
            attack_history: Vec::new(),
            progression_step: 0,
            capture_started_turn: None,
        }
    }

    /// Radius 2 plain map with the given terrain overrides.
    fn world(overrides: &[(AxialCoord, TerrainType)]) -> World {
        let mut world = World::new(2);
        for pos in range(AxialCoord::new(0, 0), Distance(2)) {
            let terrain = overrides
                .iter()
                .find(|(p, _)| *p == pos)
                .map_or(PLAIN, |(_, terrain)| *terrain);
            world.add_tile(Tile::new(pos, terrain, PlayerId(0)));
        }
        world
    }

    #[test]
    fn path_from_to() {
        let nodes = vec![NODE_0, NODE_1, NODE_2];
        let path = Path::new(nodes);
        assert_eq!(path.from(), NODE_0);
        assert_eq!(path.to(), NODE_2);
    }

    #[test]
    fn path_steps() {
        let nodes = vec![NODE_0, NODE_1, NODE_2];
        let path = Path::new(nodes);
        let mut steps = path.steps();
        assert_eq!(
            steps.next(),
            Some(Step {
                from: NODE_0,
                to: NODE_1,
            })
        );
        assert_eq!(
            steps.next(),
            Some(Step {
                from: NODE_1,
                to: NODE_2,
            })
        );
        assert_eq!(steps.next(), None);
    }

    #[test]
    fn goes_around_expensive_terrain() {
        let rules = rules();
        let swamp = AxialCoord::new(0, 0);
        let world = world(&[(swamp, SWAMP)]);
        let unit = scout(1, AxialCoord::new(-1, 0));
        let mut pathfinder = Pathfinder::new();
        pathfinder.fill_map(&world, &rules, &unit);
        let destination = AxialCoord::new(1, 0);
        let path = pathfinder.path(destination).unwrap();
        assert_eq!(path.from(), unit.pos);
        assert_eq!(path.to(), destination);
        assert!(!path.tiles().contains(&swamp));
        assert_eq!(pathfinder.cost(destination), Some(MovePoints(3)));
        assert_eq!(path.cost_for(&world, &rules, SCOUT), Ok(MovePoints(3)));
    }

    #[test]
    fn occupied_and_impassable_tiles_block() {
        let rules = rules();
        let lava = AxialCoord::new(0, 0);
        let mut world = world(&[(lava, LAVA)]);
        world.add_unit(scout(2, AxialCoord::new(1, -1))).unwrap();
        let unit = scout(1, AxialCoord::new(-1, 0));
        world.add_unit(unit.clone()).unwrap();
        let mut pathfinder = Pathfinder::new();
        pathfinder.fill_map(&world, &rules, &unit);
        assert_eq!(pathfinder.cost(lava), None);
        assert_eq!(pathfinder.cost(AxialCoord::new(1, -1)), None);
        assert!(pathfinder.path(AxialCoord::new(5, 5)).is_none());
        let path = pathfinder.path(AxialCoord::new(1, 0)).unwrap();
        assert_eq!(path.cost_for(&world, &rules, SCOUT), Ok(MovePoints(3)));
    }

    #[test]
    fn reachable_respects_budget() {
        let rules = rules();
        let world = world(&[]);
        let unit = scout(1, AxialCoord::new(0, 0));
        let mut pathfinder = Pathfinder::new();
        pathfinder.fill_map(&world, &rules, &unit);
        assert_eq!(pathfinder.reachable(MovePoints(1)).len(), 6);
        assert_eq!(pathfinder.reachable(MovePoints(2)).len(), 18);
        assert_eq!(pathfinder.path(unit.pos), Some(Path::new(vec![unit.pos])));
    }
}
