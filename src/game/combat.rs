use crate::{
    game::component::{AttackRecord, Unit},
    map::{distance, AxialCoord, Distance},
};

pub fn is_ranged(attacker_pos: AxialCoord, defender_pos: AxialCoord) -> bool {
    distance(attacker_pos, defender_pos) >= Distance(2)
}

fn is_opposite_side(defender_pos: AxialCoord, a: AxialCoord, b: AxialCoord) -> bool {
    let qa = a.q - defender_pos.q;
    let ra = a.r - defender_pos.r;
    let qb = b.q - defender_pos.q;
    let rb = b.r - defender_pos.r;
    qa == -qb && ra == -rb
}

fn record_bonus(defender_pos: AxialCoord, attacker_pos: AxialCoord, record: &AttackRecord) -> i32 {
    if is_ranged(attacker_pos, defender_pos) || record.is_ranged {
        1
    } else if distance(record.from, attacker_pos) == Distance(1) {
        1
    } else if is_opposite_side(defender_pos, record.from, attacker_pos) {
        3
    } else {
        2
    }
}

/// Bonus for hitting a unit that was already attacked this turn.
///
/// Ranged attacks get +1 per previous attack. A melee attack gets +1 for
/// each previous ranged attack or melee attack from a neighboring hex, +3
/// for an attack from the opposite side and +2 for the rest.
pub fn wound_bonus(defender: &Unit, attacker_pos: AxialCoord) -> i32 {
    defender
        .attack_history
        .iter()
        .map(|record| record_bonus(defender.pos, attacker_pos, record))
        .sum()
}
