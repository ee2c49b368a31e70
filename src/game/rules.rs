use std::{collections::HashMap, fmt, str::FromStr};

use rand::{
    distributions::{Distribution, WeightedIndex},
    Rng,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    game::{
        component::{Step, Unit},
        movement::MovePoints,
        Coins, Health, Missing, TerrainType, UnitType,
    },
    map::{distance, Distance},
    utils::{clamp_min, GameRng},
};

fn default_min_attack_range() -> Distance {
    Distance(1)
}

fn default_action_order() -> Vec<Step> {
    vec![Step::Move, Step::AttackOrCapture]
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UnitStats {
    pub name: String,
    pub health: Health,
    pub move_points: MovePoints,
    pub attack_range: Distance,

    #[serde(default = "default_min_attack_range")]
    pub min_attack_range: Distance,

    pub cost: Coins,

    #[serde(default)]
    pub can_capture: bool,

    /// Move points granted when the action order reaches `Step::Retreat`.
    #[serde(default)]
    pub retreat_points: MovePoints,

    #[serde(default = "default_action_order")]
    pub action_order: Vec<Step>,

    /// Terrain that's not listed here is impassable for the unit.
    #[serde(default)]
    pub terrain_costs: HashMap<TerrainType, MovePoints>,

    /// Health restored at turn start on a friendly or neutral tile.
    #[serde(default)]
    pub healing: HashMap<TerrainType, Health>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TerrainStats {
    pub name: String,

    #[serde(default)]
    pub buildable: Vec<UnitType>,

    #[serde(default)]
    pub capturable: bool,

    /// Paid to the owner at the end of the owner's turn.
    #[serde(default)]
    pub income: Coins,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct DamageRange {
    pub min: Health,
    pub max: Health,
    pub weight: f64,
}

/// Weighted damage ranges of one attacker/defender type pair.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct DamageDistribution {
    pub ranges: Vec<DamageRange>,

    /// Extra damage per point of wound bonus.
    #[serde(default)]
    pub per_wound_bonus: i32,
}

impl DamageDistribution {
    pub fn fixed(damage: Health) -> Self {
        Self {
            ranges: vec![DamageRange {
                min: damage,
                max: damage,
                weight: 1.0,
            }],
            per_wound_bonus: 0,
        }
    }

    pub fn min(&self) -> Health {
        self.ranges
            .iter()
            .map(|range| range.min)
            .min()
            .unwrap_or_default()
    }

    pub fn max(&self) -> Health {
        self.ranges
            .iter()
            .map(|range| range.max)
            .max()
            .unwrap_or_default()
    }

    pub fn expected(&self) -> f64 {
        let total: f64 = self.ranges.iter().map(|range| range.weight).sum();
        if total <= 0.0 {
            return 0.0;
        }
        let weighted: f64 = self
            .ranges
            .iter()
            .map(|range| range.weight * f64::from(range.min.0 + range.max.0) / 2.0)
            .sum();
        weighted / total
    }

    /// Picks a range by weight, then a uniform value inside it.
    pub fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> Health {
        let weights = self.ranges.iter().map(|range| range.weight);
        let index = match WeightedIndex::new(weights) {
            Ok(index) => index,
            Err(_) => return Health(self.expected().round() as i32),
        };
        let range = self.ranges[index.sample(rng)];
        if range.min >= range.max {
            range.min
        } else {
            Health(rng.gen_range(range.min.0..=range.max.0))
        }
    }
}

/// Everything a single damage roll depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Combat {
    pub attacker: UnitType,
    pub defender: UnitType,
    pub wound_bonus: i32,
}

/// Lookup surface of a rule set.
///
/// Every missing entry is reported as `Error::NotFound`.
pub trait Rules: fmt::Debug {
    fn unit_stats(&self, unit_type: UnitType) -> Result<&UnitStats, Error>;

    fn terrain_stats(&self, terrain: TerrainType) -> Result<&TerrainStats, Error>;

    fn movement_cost(&self, unit_type: UnitType, terrain: TerrainType)
        -> Result<MovePoints, Error>;

    fn damage_distribution(
        &self,
        attacker: UnitType,
        defender: UnitType,
    ) -> Result<&DamageDistribution, Error>;

    fn combat_damage(&self, combat: &Combat, rng: &mut GameRng) -> Result<Health, Error> {
        let distribution = self.damage_distribution(combat.attacker, combat.defender)?;
        let damage = distribution.roll(rng).0 + combat.wound_bonus * distribution.per_wound_bonus;
        Ok(Health(clamp_min(damage, 0)))
    }

    /// Range and damage table check. Ownership is checked by the caller.
    fn can_attack(&self, attacker: &Unit, defender: &Unit) -> bool {
        let stats = match self.unit_stats(attacker.unit_type) {
            Ok(stats) => stats,
            Err(_) => return false,
        };
        let dist = distance(attacker.pos, defender.pos);
        dist >= stats.min_attack_range
            && dist <= stats.attack_range
            && self
                .damage_distribution(attacker.unit_type, defender.unit_type)
                .is_ok()
    }
}

/// A rule set backed by plain tables, usually loaded from RON.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TableRules {
    #[serde(default)]
    pub units: HashMap<UnitType, UnitStats>,

    #[serde(default)]
    pub terrains: HashMap<TerrainType, TerrainStats>,

    /// Attacker type -> defender type -> damage.
    #[serde(default)]
    pub damage: HashMap<UnitType, HashMap<UnitType, DamageDistribution>>,
}

impl TableRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unit(mut self, unit_type: UnitType, stats: UnitStats) -> Self {
        self.units.insert(unit_type, stats);
        self
    }

    pub fn with_terrain(mut self, terrain: TerrainType, stats: TerrainStats) -> Self {
        self.terrains.insert(terrain, stats);
        self
    }

    pub fn with_damage(
        mut self,
        attacker: UnitType,
        defender: UnitType,
        distribution: DamageDistribution,
    ) -> Self {
        self.damage
            .entry(attacker)
            .or_insert_with(HashMap::new)
            .insert(defender, distribution);
        self
    }

    /// Rejects tables the pathfinder can't work with.
    pub fn check(&self) -> Result<(), Error> {
        for (unit_type, stats) in &self.units {
            for (terrain, &cost) in &stats.terrain_costs {
                if cost < MovePoints(1) {
                    return Err(Error::BadRules(format!(
                        "{} ({:?}) has movement cost {} on {:?}",
                        stats.name, unit_type, cost.0, terrain
                    )));
                }
            }
        }
        Ok(())
    }
}

impl FromStr for TableRules {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rules: Self = ron::de::from_str(s).map_err(|err| Error::BadRules(err.to_string()))?;
        rules.check()?;
        Ok(rules)
    }
}

impl Rules for TableRules {
    fn unit_stats(&self, unit_type: UnitType) -> Result<&UnitStats, Error> {
        self.units
            .get(&unit_type)
            .ok_or(Error::NotFound(Missing::UnitType(unit_type)))
    }

    fn terrain_stats(&self, terrain: TerrainType) -> Result<&TerrainStats, Error> {
        self.terrains
            .get(&terrain)
            .ok_or(Error::NotFound(Missing::Terrain(terrain)))
    }

    fn movement_cost(
        &self,
        unit_type: UnitType,
        terrain: TerrainType,
    ) -> Result<MovePoints, Error> {
        let stats = self.unit_stats(unit_type)?;
        stats
            .terrain_costs
            .get(&terrain)
            .cloned()
            .ok_or(Error::NotFound(Missing::MovementCost { unit_type, terrain }))
    }

    fn damage_distribution(
        &self,
        attacker: UnitType,
        defender: UnitType,
    ) -> Result<&DamageDistribution, Error> {
        self.damage
            .get(&attacker)
            .and_then(|row| row.get(&defender))
            .ok_or(Error::NotFound(Missing::Damage { attacker, defender }))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::{
        error::Error,
        game::{
            component::{Step, Unit},
            movement::MovePoints,
            Coins, Health, Missing, PlayerId, TerrainType, Turn, UnitId, UnitType,
        },
        map::{AxialCoord, Distance},
        utils::GameRng,
    };

    use super::{Combat, DamageDistribution, DamageRange, Rules, TableRules};

    const INFANTRY: UnitType = UnitType(1);
    const ARTILLERY: UnitType = UnitType(2);
    const GRASS: TerrainType = TerrainType(1);
    const BASE: TerrainType = TerrainType(2);
    const WATER: TerrainType = TerrainType(3);

    const RULES_RON: &str = r#"
        (
            units: {
                1: (
                    name: "infantry",
                    health: 100,
                    move_points: 3,
                    attack_range: 1,
                    cost: 75,
                    can_capture: true,
                    terrain_costs: {1: 1, 2: 1},
                ),
                2: (
                    name: "artillery",
                    health: 100,
                    move_points: 1,
                    attack_range: 3,
                    min_attack_range: 2,
                    cost: 200,
                    retreat_points: 1,
                    action_order: [Move, Attack, Retreat],
                    terrain_costs: {1: 1},
                ),
            },
            terrains: {
                1: (name: "grass"),
                2: (name: "base", buildable: [1, 2], capturable: true, income: 100),
                3: (name: "water"),
            },
            damage: {
                1: {
                    1: (ranges: [(min: 40, max: 60, weight: 3.0), (min: 90, max: 90, weight: 1.0)]),
                    2: (ranges: [(min: 30, max: 30, weight: 1.0)], per_wound_bonus: 5),
                },
                2: {
                    1: (ranges: [(min: 70, max: 70, weight: 1.0)]),
                },
            },
        )
    "#;

    fn rules() -> TableRules {
        RULES_RON.parse().unwrap()
    }

    fn unit(unit_type: UnitType, pos: AxialCoord) -> Unit {
        Unit {
            id: UnitId(0),
            player: PlayerId(1),
            unit_type,
            pos,
            health: Health(100),
            move_points: MovePoints(0),
            last_acted_turn: Turn(0),
            last_topped_up_turn: Turn(0),
            attack_history: Vec::new(),
            progression_step: 0,
            capture_started_turn: None,
        }
    }

    #[test]
    fn parse_rules() {
        let rules = rules();
        let artillery = rules.unit_stats(ARTILLERY).unwrap();
        assert_eq!(artillery.min_attack_range, Distance(2));
        assert_eq!(
            artillery.action_order,
            vec![Step::Move, Step::Attack, Step::Retreat]
        );
        let infantry = rules.unit_stats(INFANTRY).unwrap();
        assert_eq!(infantry.min_attack_range, Distance(1));
        assert_eq!(infantry.action_order, vec![Step::Move, Step::AttackOrCapture]);
        assert_eq!(infantry.cost, Coins(75));
        let base = rules.terrain_stats(BASE).unwrap();
        assert_eq!(base.buildable, vec![INFANTRY, ARTILLERY]);
        assert_eq!(base.income, Coins(100));
    }

    #[test]
    fn bad_rules() {
        match "(units: {1: (name: 1)})".parse::<TableRules>() {
            Err(Error::BadRules(_)) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn free_movement_is_rejected() {
        let text = r#"
            (
                units: {
                    1: (
                        name: "ghost",
                        health: 10,
                        move_points: 2,
                        attack_range: 1,
                        cost: 1,
                        terrain_costs: {1: 1, 3: 0},
                    ),
                },
            )
        "#;
        match text.parse::<TableRules>() {
            Err(Error::BadRules(message)) => assert!(message.contains("ghost"), "{}", message),
            other => panic!("unexpected: {:?}", other),
        }
        assert!(rules().check().is_ok());
    }

    #[test]
    fn missing_entries() {
        let rules = rules();
        assert_eq!(
            rules.movement_cost(INFANTRY, WATER),
            Err(Error::NotFound(Missing::MovementCost {
                unit_type: INFANTRY,
                terrain: WATER,
            }))
        );
        assert_eq!(
            rules.movement_cost(UnitType(9), GRASS),
            Err(Error::NotFound(Missing::UnitType(UnitType(9))))
        );
        assert_eq!(
            rules.damage_distribution(ARTILLERY, ARTILLERY).err(),
            Some(Error::NotFound(Missing::Damage {
                attacker: ARTILLERY,
                defender: ARTILLERY,
            }))
        );
        assert!(rules.terrain_stats(TerrainType(9)).is_err());
    }

    #[test]
    fn distribution_stats() {
        let rules = rules();
        let distribution = rules.damage_distribution(INFANTRY, INFANTRY).unwrap();
        assert_eq!(distribution.min(), Health(40));
        assert_eq!(distribution.max(), Health(90));
        assert!((distribution.expected() - 60.0).abs() < 1e-9);
        assert_eq!(DamageDistribution::default().expected(), 0.0);
    }

    #[test]
    fn rolls_stay_in_bounds() {
        let rules = rules();
        let distribution = rules.damage_distribution(INFANTRY, INFANTRY).unwrap();
        let mut rng = GameRng::new(1);
        for _ in 0..200 {
            let damage = distribution.roll(&mut rng);
            let in_low = damage >= Health(40) && damage <= Health(60);
            assert!(in_low || damage == Health(90), "{:?}", damage);
        }
    }

    #[test]
    fn degenerate_weights_fall_back_to_expected() {
        let distribution = DamageDistribution {
            ranges: vec![DamageRange {
                min: Health(10),
                max: Health(20),
                weight: 0.0,
            }],
            per_wound_bonus: 0,
        };
        let mut rng = GameRng::new(1);
        assert_eq!(distribution.roll(&mut rng), Health(0));
        assert_eq!(DamageDistribution::default().roll(&mut rng), Health(0));
    }

    #[test]
    fn combat_damage_with_wound_bonus() {
        let rules = rules();
        let mut rng = GameRng::new(3);
        let combat = Combat {
            attacker: INFANTRY,
            defender: ARTILLERY,
            wound_bonus: 2,
        };
        assert_eq!(rules.combat_damage(&combat, &mut rng), Ok(Health(40)));
    }

    #[test]
    fn attack_ranges() {
        let rules = rules();
        let origin = AxialCoord::new(0, 0);
        let infantry = unit(INFANTRY, origin);
        let artillery = unit(ARTILLERY, origin);
        let near = unit(INFANTRY, AxialCoord::new(1, 0));
        let far = unit(INFANTRY, AxialCoord::new(3, -1));
        assert!(rules.can_attack(&infantry, &near));
        assert!(!rules.can_attack(&infantry, &far));
        assert!(!rules.can_attack(&artillery, &near));
        assert!(rules.can_attack(&artillery, &far));
        // no damage entry for artillery vs artillery
        let far_artillery = unit(ARTILLERY, AxialCoord::new(3, -1));
        assert!(!rules.can_attack(&artillery, &far_artillery));
    }
}
