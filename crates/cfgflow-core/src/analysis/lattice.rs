/*! Fact lattices carried on graph edges.
 *
 * Every lattice used by the engine is a join semi-lattice of finite height: index sets are
 * bounded by the instruction count, points-to maps by its square. Joins are pure; a fact that has
 * been written to the store is never mutated again, so sharing one result across several edges is
 * always safe.
 */

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

pub trait Lattice: Clone + PartialEq + fmt::Debug {
    fn bottom() -> Self;

    /// Merges `other` into `self`, returning whether `self` grew.
    fn join_assign(&mut self, other: &Self) -> bool;

    fn join(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.join_assign(other);
        result
    }

    /// Lattice order: `self <= other` iff joining `self` into `other` changes nothing.
    fn leq(&self, other: &Self) -> bool {
        other.join(self) == *other
    }

    fn join_all<'a, I>(facts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        facts.into_iter().fold(Self::bottom(), |mut acc, fact| {
            acc.join_assign(fact);
            acc
        })
    }
}

/// Set of instruction indices, ordered by subset with union as join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstSet(BTreeSet<usize>);

impl InstSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, index: usize) -> bool {
        self.0.insert(index)
    }

    pub fn remove(&mut self, index: usize) -> bool {
        self.0.remove(&index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.0.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<usize> for InstSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[usize; N]> for InstSet {
    fn from(indices: [usize; N]) -> Self {
        indices.into_iter().collect()
    }
}

impl Lattice for InstSet {
    fn bottom() -> Self {
        Self::new()
    }

    fn join_assign(&mut self, other: &Self) -> bool {
        let before = self.0.len();
        self.0.extend(other.0.iter().copied());
        self.0.len() != before
    }

    fn leq(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }
}

/// Renders as `0|3|7|`.
impl fmt::Display for InstSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in &self.0 {
            write!(f, "{}|", index)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellKind {
    Memory,
    Register,
}

/// Abstract storage location named after the instruction that created it.
///
/// Register cells hold instruction results; memory cells are the objects an `alloca` reserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub kind: CellKind,
    pub owner: usize,
}

impl Cell {
    pub fn register(owner: usize) -> Self {
        Self {
            kind: CellKind::Register,
            owner,
        }
    }

    pub fn memory(owner: usize) -> Self {
        Self {
            kind: CellKind::Memory,
            owner,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.kind {
            CellKind::Register => 'R',
            CellKind::Memory => 'M',
        };
        write!(f, "{}{}", tag, self.owner)
    }
}

impl FromStr for Cell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.chars().next() {
            Some('R') => CellKind::Register,
            Some('M') => CellKind::Memory,
            _ => return Err(format!("invalid cell '{}'", s)),
        };
        let owner = s[1..]
            .parse()
            .map_err(|_| format!("invalid cell owner in '{}'", s))?;
        Ok(Self { kind, owner })
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// May-point-to map from a cell to the cells it may reference.
///
/// Value sets are never empty, so two facts are equal exactly when they have the same keys and
/// the same pointees per key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PointsToFact(BTreeMap<Cell, BTreeSet<Cell>>);

impl PointsToFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pointer: Cell, pointee: Cell) -> bool {
        self.0.entry(pointer).or_default().insert(pointee)
    }

    /// Pointees of `cell`, cloned so the caller may keep adding to `self`.
    pub fn pointees(&self, cell: &Cell) -> Vec<Cell> {
        self.0
            .get(cell)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn points_to(&self, pointer: &Cell, pointee: &Cell) -> bool {
        self.0
            .get(pointer)
            .map(|set| set.contains(pointee))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Cell, &BTreeSet<Cell>)> + '_ {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(Cell, Cell)> for PointsToFact {
    fn from_iter<I: IntoIterator<Item = (Cell, Cell)>>(iter: I) -> Self {
        let mut fact = Self::new();
        for (pointer, pointee) in iter {
            fact.add(pointer, pointee);
        }
        fact
    }
}

impl Lattice for PointsToFact {
    fn bottom() -> Self {
        Self::new()
    }

    fn join_assign(&mut self, other: &Self) -> bool {
        let mut changed = false;
        for (pointer, pointees) in &other.0 {
            let entry = self.0.entry(*pointer).or_default();
            for pointee in pointees {
                changed |= entry.insert(*pointee);
            }
        }
        changed
    }

    fn leq(&self, other: &Self) -> bool {
        self.0.iter().all(|(pointer, pointees)| {
            other
                .0
                .get(pointer)
                .map(|theirs| pointees.is_subset(theirs))
                .unwrap_or(false)
        })
    }
}

/// Renders as `R1->(M0/M2/)|M0->(M2/)|`.
impl fmt::Display for PointsToFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pointer, pointees) in &self.0 {
            write!(f, "{}->(", pointer)?;
            for pointee in pointees {
                write!(f, "{}/", pointee)?;
            }
            write!(f, ")|")?;
        }
        Ok(())
    }
}
