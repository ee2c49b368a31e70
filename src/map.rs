use std::{fmt, ops::Add, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Distance(pub i32);

/// Axial coordinates
/// <http://www.redblobgames.com/grids/hexagons/#coordinates-axial>
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct AxialCoord {
    pub q: i32,
    pub r: i32,
}

impl AxialCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The third cube coordinate.
    pub fn s(self) -> i32 {
        -self.q - self.r
    }

    pub fn neighbor(self, dir: Dir) -> Self {
        Dir::get_neighbor_pos(self, dir)
    }

    pub fn neighbors(self) -> impl Iterator<Item = AxialCoord> {
        dirs().map(move |dir| self.neighbor(dir))
    }
}

impl Add for AxialCoord {
    type Output = AxialCoord;

    fn add(self, other: AxialCoord) -> AxialCoord {
        AxialCoord::new(self.q + other.q, self.r + other.r)
    }
}

/// Canonical `q,r` key form.
impl fmt::Display for AxialCoord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

impl FromStr for AxialCoord {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad_key = || Error::BadCoordKey(s.to_string());
        let mut parts = s.split(',');
        let q = parts.next().ok_or_else(bad_key)?;
        let r = parts.next().ok_or_else(bad_key)?;
        if parts.next().is_some() {
            return Err(bad_key());
        }
        let q = q.trim().parse().map_err(|_| bad_key())?;
        let r = r.trim().parse().map_err(|_| bad_key())?;
        Ok(AxialCoord { q, r })
    }
}

pub fn distance(a: AxialCoord, b: AxialCoord) -> Distance {
    let dq = a.q - b.q;
    let dr = a.r - b.r;
    Distance((dq.abs() + dr.abs() + (dq + dr).abs()) / 2)
}

/// Odd-r offset conversion, returns `(row, col)`.
/// <https://www.redblobgames.com/grids/hexagons/#conversions-offset>
pub fn hex_to_row_col(pos: AxialCoord) -> (i32, i32) {
    let col = pos.q + (pos.r - (pos.r & 1)) / 2;
    (pos.r, col)
}

pub fn row_col_to_hex(row: i32, col: i32) -> AxialCoord {
    let q = col - (row - (row & 1)) / 2;
    AxialCoord { q, r: row }
}

/// All positions within `radius` of `center`, center included.
#[derive(Clone, Debug)]
pub struct RangeIter {
    center: AxialCoord,
    radius: i32,
    cursor: AxialCoord,
}

pub fn range(center: AxialCoord, radius: Distance) -> RangeIter {
    let radius = radius.0;
    let q = -radius;
    RangeIter {
        center,
        radius,
        cursor: AxialCoord::new(q, row_start(q, radius)),
    }
}

fn row_start(q: i32, radius: i32) -> i32 {
    (-radius).max(-q - radius)
}

fn row_end(q: i32, radius: i32) -> i32 {
    radius.min(-q + radius)
}

impl Iterator for RangeIter {
    type Item = AxialCoord;

    fn next(&mut self) -> Option<AxialCoord> {
        if self.cursor.q > self.radius {
            return None;
        }
        let current = self.center + self.cursor;
        self.cursor.r += 1;
        if self.cursor.r > row_end(self.cursor.q, self.radius) {
            self.cursor.q += 1;
            self.cursor.r = row_start(self.cursor.q, self.radius);
        }
        Some(current)
    }
}

/// Walking order of a ring, starting from the `Left` corner.
const RING_DIRS: [Dir; 6] = [
    Dir::TopRight,
    Dir::Right,
    Dir::BottomRight,
    Dir::BottomLeft,
    Dir::Left,
    Dir::TopLeft,
];

/// Positions at exactly `radius` from `center`.
#[derive(Clone, Debug)]
pub struct RingIter {
    cursor: AxialCoord,
    radius: i32,
    side: usize,
    step: i32,
    done: bool,
}

pub fn ring(center: AxialCoord, radius: Distance) -> RingIter {
    let mut cursor = center;
    for _ in 0..radius.0 {
        cursor = cursor.neighbor(Dir::Left);
    }
    RingIter {
        cursor,
        radius: radius.0,
        side: 0,
        step: 0,
        done: radius.0 < 0,
    }
}

impl Iterator for RingIter {
    type Item = AxialCoord;

    fn next(&mut self) -> Option<AxialCoord> {
        if self.done {
            return None;
        }
        if self.radius == 0 {
            self.done = true;
            return Some(self.cursor);
        }
        let current = self.cursor;
        self.cursor = self.cursor.neighbor(RING_DIRS[self.side]);
        self.step += 1;
        if self.step == self.radius {
            self.step = 0;
            self.side += 1;
            self.done = self.side == RING_DIRS.len();
        }
        Some(current)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dir {
    Left,
    TopLeft,
    TopRight,
    Right,
    BottomRight,
    BottomLeft,
}

/// <http://www.redblobgames.com/grids/hexagons/#neighbors-axial>
const DIR_TO_POS_DIFF: [[i32; 2]; 6] = [[-1, 0], [0, -1], [1, -1], [1, 0], [0, 1], [-1, 1]];

impl Dir {
    pub fn from_int(n: i32) -> Self {
        assert!((0..6).contains(&n));
        let dirs = [
            Dir::Left,
            Dir::TopLeft,
            Dir::TopRight,
            Dir::Right,
            Dir::BottomRight,
            Dir::BottomLeft,
        ];
        dirs[n as usize]
    }

    pub fn to_int(self) -> i32 {
        match self {
            Dir::Left => 0,
            Dir::TopLeft => 1,
            Dir::TopRight => 2,
            Dir::Right => 3,
            Dir::BottomRight => 4,
            Dir::BottomLeft => 5,
        }
    }

    pub fn opposite(self) -> Self {
        Dir::from_int((self.to_int() + 3) % 6)
    }

    /// `None` if the positions aren't neighbors.
    pub fn get_dir_from_to(from: AxialCoord, to: AxialCoord) -> Option<Dir> {
        let diff = [to.q - from.q, to.r - from.r];
        dirs().find(|dir| diff == DIR_TO_POS_DIFF[dir.to_int() as usize])
    }

    pub fn get_neighbor_pos(pos: AxialCoord, dir: Dir) -> AxialCoord {
        let diff = DIR_TO_POS_DIFF[dir.to_int() as usize];
        AxialCoord {
            q: pos.q + diff[0],
            r: pos.r + diff[1],
        }
    }
}

#[derive(Clone, Debug)]
pub struct DirIter {
    index: i32,
}

pub fn dirs() -> DirIter {
    DirIter { index: 0 }
}

impl Iterator for DirIter {
    type Item = Dir;

    fn next(&mut self) -> Option<Dir> {
        let max = DIR_TO_POS_DIFF.len() as i32;
        let next_dir = if self.index >= max {
            None
        } else {
            Some(Dir::from_int(self.index))
        };
        self.index += 1;
        next_dir
    }
}

/// Serializes coordinate-keyed maps with `"q,r"` string keys.
///
/// Use with `#[serde(with = "crate::map::coord_map")]`.
pub mod coord_map {
    use std::collections::BTreeMap;

    use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};

    use super::AxialCoord;

    pub fn serialize<V, S>(map: &BTreeMap<AxialCoord, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(pos, value)| (pos.to_string(), value)))
    }

    pub fn deserialize<'de, V, D>(deserializer: D) -> Result<BTreeMap<AxialCoord, V>, D::Error>
    where
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let raw: BTreeMap<String, V> = BTreeMap::deserialize(deserializer)?;
        let mut map = BTreeMap::new();
        for (key, value) in raw {
            let pos: AxialCoord = key.parse().map_err(D::Error::custom)?;
            map.insert(pos, value);
        }
        Ok(map)
    }
}
