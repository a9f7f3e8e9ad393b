//! Straight-line connectivity between islands.
//!
//! [`can_connect`] is the one place that decides whether two islands may be bridged. The generator relies on it
//! through [`Board::add_bridge`] to keep every intermediate board valid, and the constraint model relies on it to
//! enumerate potential bridges and the pairs of them that cross.

use itertools::Itertools;
use thiserror::Error;
use unordered_pair::UnorderedPair;

use crate::board::{Board, IslandId, Thickness};
use crate::cell::Cell;
use crate::direction::Direction;
use crate::location::Location;

/// Reasons a bridge cannot run between two islands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum GeometryError {
    /// No island has this id.
    #[error("island {0} does not exist")]
    UnknownIsland(IslandId),
    /// Both ends are the same island.
    #[error("island {0} cannot be bridged to itself")]
    SameIsland(IslandId),
    /// The islands share neither row nor column.
    #[error("islands at {a} and {b} share neither row nor column")]
    NotAligned {
        /// Location of the first island.
        a: Location,
        /// Location of the second island.
        b: Location,
    },
    /// Another island lies on the path.
    #[error("the island at {at} lies between the endpoints")]
    Obstructed {
        /// The blocking island's location.
        at: Location,
    },
    /// A bridge between other islands lies on the path.
    #[error("the path crosses another bridge at {at}")]
    Crossing {
        /// The first cell where the bridges meet.
        at: Location,
    },
    /// The bridge requested is already in place.
    #[error("the islands are already joined by a {0:?} bridge")]
    Unchanged(Thickness),
}

/// The straight run of cells strictly between two aligned locations.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Segment {
    /// The endpoint ordered first in row-major order.
    pub from: Location,
    /// The endpoint ordered second.
    pub to: Location,
    /// Always one of [`Direction::FORWARD_VARIANTS`].
    pub direction: Direction,
}

impl Segment {
    /// The segment joining `a` and `b`, or [`None`] if they share neither row nor column.
    pub fn between(a: Location, b: Location) -> Option<Self> {
        let direction = Direction::between(a, b)?;
        let (from, to) = if direction.ensure_forward() == direction { (a, b) } else { (b, a) };

        Some(Self { from, to, direction: direction.ensure_forward() })
    }

    /// Number of cells spanned, excluding both endpoints.
    pub fn length(&self) -> usize {
        match self.direction.is_horizontal() {
            true => self.to.0 - self.from.0 - 1,
            false => self.to.1 - self.from.1 - 1,
        }
    }

    /// The cells spanned, excluding both endpoints, in order from [`Self::from`].
    pub fn cells(&self) -> impl Iterator<Item = Location> + '_ {
        (1..=self.length()).map(|steps| self.direction.attempt_from(self.from, steps))
    }

    /// True if the two segments are perpendicular and meet at a cell interior to both.
    pub fn crosses(&self, other: &Segment) -> bool {
        if self.direction.is_horizontal() == other.direction.is_horizontal() {
            return false;
        }

        let (horizontal, vertical) = if self.direction.is_horizontal() { (self, other) } else { (other, self) };
        let row = horizontal.from.1;
        let column = vertical.from.0;

        (horizontal.from.0 < column && column < horizontal.to.0)
            && (vertical.from.1 < row && row < vertical.to.1)
    }
}

/// A permitted straight-line bridge between two islands.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Connection {
    /// The islands a bridge would join.
    pub endpoints: UnorderedPair<IslandId>,
    /// The path a bridge would take.
    pub segment: Segment,
    /// The bridge currently realized on this pair, if any.
    pub existing: Option<Thickness>,
}

impl Connection {
    /// The endpoints as `(lower id, higher id)`.
    pub fn islands(&self) -> (IslandId, IslandId) {
        let UnorderedPair(a, b) = self.endpoints;
        (a.min(b), a.max(b))
    }

    /// The thickest bridge the pair may carry.
    ///
    /// This is [`Thickness::Double`] for every connection: crossings and obstructions decide whether a pair can be
    /// bridged at all, never how thick the bridge may be. Required degrees limit thickness, and only the solver
    /// sees those.
    pub fn max_thickness(&self) -> Thickness {
        Thickness::Double
    }

    /// The cells a bridge on this pair would occupy.
    pub fn path(&self) -> Vec<Location> {
        self.segment.cells().collect_vec()
    }

    /// True if bridges on both connections could not coexist because their paths cross.
    pub fn crosses(&self, other: &Connection) -> bool {
        self.segment.crosses(&other.segment)
    }
}

/// Decide whether islands `a` and `b` of `board` can be joined by a straight bridge.
///
/// They must share a row or column, no island may lie between them, and the path must not pass through a cell
/// occupied by a bridge on any other pair. A bridge already joining `a` and `b` does not block; it is reported
/// in [`Connection::existing`].
pub fn can_connect(board: &Board, a: IslandId, b: IslandId) -> Result<Connection, GeometryError> {
    let island_a = board.island(a).ok_or(GeometryError::UnknownIsland(a))?;
    let island_b = board.island(b).ok_or(GeometryError::UnknownIsland(b))?;
    if a == b {
        return Err(GeometryError::SameIsland(a));
    }

    let segment = Segment::between(island_a.location, island_b.location)
        .ok_or(GeometryError::NotAligned { a: island_a.location, b: island_b.location })?;
    let endpoints = UnorderedPair(a, b);

    for at in segment.cells() {
        match board.cell(at) {
            Some(Cell::Island { .. }) => return Err(GeometryError::Obstructed { at }),
            Some(Cell::Bridge { endpoints: other, .. }) if *other != endpoints => {
                return Err(GeometryError::Crossing { at });
            }
            _ => {}
        }
    }

    Ok(Connection {
        endpoints,
        segment,
        existing: board.bridge_between(a, b),
    })
}

/// [`can_connect`], discarding the reason for a refusal.
pub fn connectable(board: &Board, a: IslandId, b: IslandId) -> Option<Connection> {
    can_connect(board, a, b).ok()
}

/// Every pair of islands that can be joined, ordered by `(lower id, higher id)`.
pub fn potential_bridges(board: &Board) -> Vec<Connection> {
    (0..board.island_count())
        .tuple_combinations()
        .filter_map(|(a, b)| connectable(board, a, b))
        .collect_vec()
}

/// Indices `(i, j)`, `i < j`, of every two connections in `connections` whose paths cross.
pub fn crossing_pairs(connections: &[Connection]) -> Vec<(usize, usize)> {
    connections.iter()
        .enumerate()
        .tuple_combinations()
        .filter(|((_, c1), (_, c2))| c1.crosses(c2))
        .map(|((i, _), (j, _))| (i, j))
        .collect_vec()
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use crate::board::{Board, Thickness};
    use crate::geometry::{can_connect, crossing_pairs, potential_bridges, GeometryError, Segment};
    use crate::location::Location;

    fn empty(width: usize, height: usize) -> Board {
        Board::with_dims((NonZero::new(width).unwrap(), NonZero::new(height).unwrap()))
    }

    #[test]
    fn segment_orders_endpoints() {
        let segment = Segment::between(Location(4, 1), Location(0, 1)).unwrap();
        assert_eq!(segment.from, Location(0, 1));
        assert_eq!(segment.length(), 3);
        assert_eq!(segment.cells().collect::<Vec<_>>(), vec![Location(1, 1), Location(2, 1), Location(3, 1)]);
        assert!(Segment::between(Location(0, 0), Location(1, 1)).is_none());
    }

    #[test]
    fn perpendicular_segments_cross_only_in_interiors() {
        let horizontal = Segment::between(Location(0, 1), Location(2, 1)).unwrap();
        let vertical = Segment::between(Location(1, 0), Location(1, 2)).unwrap();
        assert!(horizontal.crosses(&vertical));
        assert!(vertical.crosses(&horizontal));

        // meets the horizontal one at its endpoint
        let touching = Segment::between(Location(2, 0), Location(2, 2)).unwrap();
        assert!(!horizontal.crosses(&touching));
    }

    #[test]
    fn island_in_between_obstructs() {
        let mut board = empty(5, 1);
        let a = board.add_island(Location(0, 0), 1).unwrap();
        board.add_island(Location(2, 0), 2).unwrap();
        let c = board.add_island(Location(4, 0), 1).unwrap();

        assert_eq!(can_connect(&board, a.id, c.id), Err(GeometryError::Obstructed { at: Location(2, 0) }));
        assert_eq!(potential_bridges(&board).len(), 2);
    }

    #[test]
    fn existing_bridge_blocks_others_but_not_itself() {
        let mut board = empty(3, 3);
        let left = board.add_island(Location(0, 1), 1).unwrap();
        let right = board.add_island(Location(2, 1), 1).unwrap();
        let top = board.add_island(Location(1, 0), 1).unwrap();
        let bottom = board.add_island(Location(1, 2), 1).unwrap();

        assert_eq!(crossing_pairs(&potential_bridges(&board)), vec![(0, 1)]);

        board.add_bridge(left.id, right.id, Thickness::Single).unwrap();
        assert_eq!(can_connect(&board, top.id, bottom.id), Err(GeometryError::Crossing { at: Location(1, 1) }));

        let again = can_connect(&board, right.id, left.id).unwrap();
        assert_eq!(again.existing, Some(Thickness::Single));
        assert_eq!(again.path(), vec![Location(1, 1)]);
        assert_eq!(again.max_thickness(), Thickness::Double);
    }

    #[test]
    fn diagonal_and_unknown_islands_are_refused() {
        let mut board = empty(3, 3);
        let a = board.add_island(Location(0, 0), 1).unwrap();
        let b = board.add_island(Location(2, 2), 1).unwrap();

        assert!(matches!(can_connect(&board, a.id, b.id), Err(GeometryError::NotAligned { .. })));
        assert_eq!(can_connect(&board, a.id, 7), Err(GeometryError::UnknownIsland(7)));
        assert_eq!(can_connect(&board, a.id, a.id), Err(GeometryError::SameIsland(a.id)));
    }
}
