//! Islands, bridges and the board holding them.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use ndarray::Array2;
use petgraph::graphmap::UnGraphMap;
use petgraph::visit::Dfs;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unordered_pair::UnorderedPair;

use crate::builder::BoardRecord;
use crate::cell::Cell;
use crate::direction::Direction;
use crate::geometry::{self, GeometryError, Segment};
use crate::location::{Dimension, Location};

/// Index of an island in insertion order. Ids are dense: the first island is 0.
pub type IslandId = usize;
/// Required or realized total bridge thickness at an island.
pub type Degree = u8;

/// The largest degree an island can have: two bridges in each of four directions.
pub const MAX_DEGREE: Degree = 8;

/// Number of parallel bridges joining two islands.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum Thickness {
    /// One bridge.
    Single,
    /// Two parallel bridges.
    Double,
}

impl Thickness {
    /// The contribution of this bridge to the degree of each endpoint.
    pub fn count(&self) -> Degree {
        match self {
            Self::Single => 1,
            Self::Double => 2,
        }
    }

    /// The thickness carrying `count` bridges, if there is one.
    pub fn from_count(count: i64) -> Option<Self> {
        match count {
            1 => Some(Self::Single),
            2 => Some(Self::Double),
            _ => None,
        }
    }
}

/// A numbered island.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Island {
    /// Insertion index on its board.
    pub id: IslandId,
    /// Where the island sits.
    pub location: Location,
    /// Required total thickness of attached bridges.
    pub degree: Degree,
}

/// A realized bridge between two islands sharing a row or column.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Bridge {
    /// The islands joined.
    pub endpoints: UnorderedPair<IslandId>,
    /// Number of parallel bridges.
    pub thickness: Thickness,
    /// Number of empty cells spanned.
    pub length: usize,
}

/// Reasons an island could not be placed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum PlacementError {
    /// The location is off the board.
    #[error("location {0} lies outside the board")]
    OutOfBounds(Location),
    /// An island or bridge already covers the location.
    #[error("location {0} is already occupied")]
    Occupied(Location),
}

/// The first rule a bridged board breaks, as reported by [`Board::check_solution`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SolutionViolation {
    /// An island carries the wrong total thickness.
    #[error("island {island} requires degree {required} but has {realized}")]
    DegreeMismatch {
        /// The offending island.
        island: IslandId,
        /// Its required degree.
        required: Degree,
        /// Total thickness of its bridges.
        realized: Degree,
    },
    /// The bridges leave more than one group of islands.
    #[error("islands {unreached:?} are not reachable from island 0")]
    Disconnected {
        /// Every island outside the group containing island 0.
        unreached: Vec<IslandId>,
    },
    /// Two bridges cross.
    #[error("bridges {first:?} and {second:?} cross")]
    Crossing {
        /// Endpoints of one bridge.
        first: UnorderedPair<IslandId>,
        /// Endpoints of the other.
        second: UnorderedPair<IslandId>,
    },
}

/// A rectangular Bridges board: islands, their required degrees, and whatever bridges have been realized.
///
/// A board without bridges is a puzzle; see [`Board::to_puzzle`].
/// Boards are built with a [`PuzzleBuilder`](crate::builder::PuzzleBuilder), parsed from text, or produced by a
/// [`Generator`](crate::generator::Generator).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "BoardRecord", try_from = "BoardRecord")]
pub struct Board {
    pub(crate) dims: (Dimension, Dimension),
    // row major
    pub(crate) cells: Array2<Cell>,
    pub(crate) islands: Vec<Island>,
    pub(crate) graph: UnGraphMap<IslandId, Thickness>,
}

impl Board {
    /// An empty board of the given `(width, height)`.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            cells: Array2::from_shape_simple_fn((dims.1.get(), dims.0.get()), Cell::default),
            islands: Vec::new(),
            graph: UnGraphMap::new(),
        }
    }

    /// `(width, height)`
    pub fn dims(&self) -> (Dimension, Dimension) {
        self.dims
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.dims.0.get()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.dims.1.get()
    }

    /// Every island, indexed by id.
    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    /// The island with `id`, if there is one.
    pub fn island(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id)
    }

    /// Number of islands placed.
    pub fn island_count(&self) -> usize {
        self.islands.len()
    }

    /// The island sitting at `location`, if there is one.
    pub fn island_at(&self, location: Location) -> Option<&Island> {
        match self.cell(location) {
            Some(Cell::Island { id }) => self.islands.get(*id),
            _ => None,
        }
    }

    pub(crate) fn cell(&self, location: Location) -> Option<&Cell> {
        self.cells.get(location.as_index())
    }

    /// All realized bridges, ordered by their endpoints.
    pub fn bridges(&self) -> Vec<Bridge> {
        self.graph.all_edges()
            .map(|(a, b, thickness)| Bridge {
                endpoints: UnorderedPair(a.min(b), a.max(b)),
                thickness: *thickness,
                length: self.segment_of(a, b).map_or(0, |segment| segment.length()),
            })
            .sorted_by_key(|bridge| (bridge.endpoints.0, bridge.endpoints.1))
            .collect_vec()
    }

    /// The thickness of the bridge joining `a` and `b`, if one exists.
    pub fn bridge_between(&self, a: IslandId, b: IslandId) -> Option<Thickness> {
        self.graph.edge_weight(a, b).copied()
    }

    /// Sum of the thicknesses of all bridges attached to `id`.
    pub fn realized_degree(&self, id: IslandId) -> Degree {
        if !self.graph.contains_node(id) {
            return 0;
        }

        self.graph.edges(id).map(|(_, _, thickness)| thickness.count()).sum()
    }

    /// Place a new island with required `degree` at `location`.
    pub fn add_island(&mut self, location: Location, degree: Degree) -> Result<Island, PlacementError> {
        let Some(cell) = self.cells.get_mut(location.as_index()) else {
            return Err(PlacementError::OutOfBounds(location));
        };
        if !cell.is_empty() {
            return Err(PlacementError::Occupied(location));
        }

        let island = Island { id: self.islands.len(), location, degree };
        *cell = Cell::Island { id: island.id };
        self.islands.push(island);
        self.graph.add_node(island.id);

        Ok(island)
    }

    /// Remove the most recently added island, provided no bridge is attached to it.
    ///
    /// Returns the removed island, or [`None`] if there is no island or the last one is bridged.
    pub fn pop_island(&mut self) -> Option<Island> {
        let last = *self.islands.last()?;
        if self.graph.neighbors(last.id).next().is_some() {
            return None;
        }

        self.islands.pop();
        self.graph.remove_node(last.id);
        if let Some(cell) = self.cells.get_mut(last.location.as_index()) {
            *cell = Cell::Empty;
        }

        Some(last)
    }

    /// Realize a bridge of `thickness` between islands `a` and `b`.
    ///
    /// There is at most one bridge per pair of islands; a bridge of a different thickness on the same pair is
    /// replaced. Fails if [`geometry::can_connect`] rejects the pair, or if the pair is already bridged with
    /// exactly this thickness.
    pub fn add_bridge(&mut self, a: IslandId, b: IslandId, thickness: Thickness) -> Result<Bridge, GeometryError> {
        let connection = geometry::can_connect(self, a, b)?;
        if connection.existing == Some(thickness) {
            return Err(GeometryError::Unchanged(thickness));
        }

        for location in connection.segment.cells() {
            if let Some(cell) = self.cells.get_mut(location.as_index()) {
                *cell = Cell::Bridge {
                    endpoints: connection.endpoints,
                    direction: connection.segment.direction,
                    thickness,
                };
            }
        }
        self.graph.add_edge(a, b, thickness);

        Ok(Bridge {
            endpoints: connection.endpoints,
            thickness,
            length: connection.segment.length(),
        })
    }

    /// A copy of this board with every bridge removed: the puzzle as presented to a solver.
    pub fn to_puzzle(&self) -> Self {
        let mut graph = UnGraphMap::with_capacity(self.islands.len(), 0);
        let cells = self.cells.map(|cell| match cell {
            Cell::Bridge { .. } => Cell::Empty,
            other => *other,
        });
        self.islands.iter().for_each(|island| { graph.add_node(island.id); });

        Self {
            dims: self.dims,
            cells,
            islands: self.islands.clone(),
            graph,
        }
    }

    pub(crate) fn set_degree(&mut self, id: IslandId, degree: Degree) {
        if let Some(island) = self.islands.get_mut(id) {
            island.degree = degree;
        }
    }

    /// Fix every island's required degree to the total thickness currently attached to it.
    pub(crate) fn settle_degrees(&mut self) {
        for id in 0..self.islands.len() {
            self.set_degree(id, self.realized_degree(id));
        }
    }

    /// True if the outermost row or column on any side contains no island.
    pub fn is_degenerate(&self) -> bool {
        let last_row = self.height() - 1;
        let last_column = self.width() - 1;

        [
            self.cells.row(0),
            self.cells.row(last_row),
            self.cells.column(0),
            self.cells.column(last_column),
        ].iter().any(|line| !line.iter().any(Cell::is_island))
    }

    /// True if some island sits on a cell orthogonally adjacent to `location`.
    pub(crate) fn has_island_neighbor(&self, location: Location) -> bool {
        Direction::neighbors_of(location)
            .any(|(_, neighbor)| self.cell(neighbor).is_some_and(Cell::is_island))
    }

    /// Islands not reachable from island 0 over realized bridges.
    fn unreached(&self) -> Vec<IslandId> {
        let Some(root) = self.islands.first() else {
            return Vec::new();
        };

        let mut reached = vec![false; self.islands.len()];
        let mut dfs = Dfs::new(&self.graph, root.id);
        while let Some(id) = dfs.next(&self.graph) {
            reached[id] = true;
        }

        reached.iter().positions(|seen| !seen).collect_vec()
    }

    /// True if the bridges join all islands into a single component.
    pub fn is_connected(&self) -> bool {
        self.unreached().is_empty()
    }

    /// Check that the realized bridges solve this board: every island's degree is met exactly, no two bridges
    /// cross, and every island is reachable from every other.
    pub fn check_solution(&self) -> Result<(), SolutionViolation> {
        for island in &self.islands {
            let realized = self.realized_degree(island.id);
            if realized != island.degree {
                return Err(SolutionViolation::DegreeMismatch {
                    island: island.id,
                    required: island.degree,
                    realized,
                });
            }
        }

        let segments = self.graph.all_edges()
            .filter_map(|(a, b, _)| Some((UnorderedPair(a, b), self.segment_of(a, b)?)))
            .collect_vec();
        if let Some(((first, _), (second, _))) = segments.iter()
            .tuple_combinations()
            .find(|((_, s1), (_, s2))| s1.crosses(s2)) {
            return Err(SolutionViolation::Crossing { first: *first, second: *second });
        }

        let unreached = self.unreached();
        if !unreached.is_empty() {
            return Err(SolutionViolation::Disconnected { unreached });
        }

        Ok(())
    }

    /// [`Self::check_solution`] as a predicate.
    pub fn is_solved(&self) -> bool {
        self.check_solution().is_ok()
    }

    fn segment_of(&self, a: IslandId, b: IslandId) -> Option<Segment> {
        Segment::between(self.islands.get(a)?.location, self.islands.get(b)?.location)
    }
}

/// Renders one character per cell: `.` empty, the degree for islands, `-`/`=` for horizontal and `|`/`H` for
/// vertical single/double bridges.
impl Display for Board {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let degree_of = |id: IslandId| self.islands.get(id).map_or(0, |island| island.degree);

        for row in self.cells.rows() {
            for cell in row {
                write!(f, "{}", cell.display(degree_of))?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
