//! Building boards by hand, from text, and from serialized records.

use std::num::NonZero;
use std::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use unordered_pair::UnorderedPair;

use crate::board::{Board, Degree, Island, IslandId, PlacementError, Thickness, MAX_DEGREE};
use crate::geometry::GeometryError;
use crate::location::{Dimension, Location};

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderInvalidReason {
    /// An island or bridge endpoint was placed outside the bounds specified by `dims`.
    FeatureOutOfBounds,
    /// An island was placed on a cell already holding an island or bridge.
    LocationOccupied,
    /// An island degree outside `1..=8`.
    DegreeOutOfRange,
    /// A bridge endpoint does not hold an island.
    NotAnIsland,
    /// The bridge was refused by the geometry checks.
    InvalidBridge(GeometryError),
}

impl From<PlacementError> for BuilderInvalidReason {
    fn from(value: PlacementError) -> Self {
        match value {
            PlacementError::OutOfBounds(_) => Self::FeatureOutOfBounds,
            PlacementError::Occupied(_) => Self::LocationOccupied,
        }
    }
}

/// A builder for puzzle boards.
///
/// Every call is checked against the board built so far; the first failure puts the builder in an invalid state
/// and every later call does nothing. Builders can be [`Clone`]d to save their state at some point.
#[derive(Clone)]
pub struct PuzzleBuilder {
    board: Board,
    invalid_reasons: Vec<BuilderInvalidReason>,
}

impl Default for PuzzleBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::new(7).unwrap(), NonZero::new(7).unwrap()))
    }
}

impl PuzzleBuilder {
    /// Construct a new [`Self`] with the specified dimensions, specified in `(x, y)` order.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            board: Board::with_dims(dims),
            invalid_reasons: Default::default(),
        }
    }

    /// Add an island requiring `degree` bridges at `location`. Islands receive ids in the order they are added.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds),
    /// [`LocationOccupied`](BuilderInvalidReason::LocationOccupied) or
    /// [`DegreeOutOfRange`](BuilderInvalidReason::DegreeOutOfRange) invalid state.
    /// If the builder is already in an invalid state, this function does nothing.
    pub fn add_island(&mut self, location: Location, degree: Degree) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !(1..=MAX_DEGREE).contains(&degree) {
            self.invalid_reasons.push(BuilderInvalidReason::DegreeOutOfRange);
            return self;
        }

        if let Err(error) = self.board.add_island(location, degree) {
            self.invalid_reasons.push(error.into());
        }

        self
    }

    /// Remove the most recently added island.
    ///
    /// If the builder is in an invalid state, no island is present, or a bridge is attached to the last island,
    /// this function does nothing.
    pub fn pop_island(&mut self) -> &mut Self {
        if self.invalid_reasons.is_empty() {
            self.board.pop_island();
        }

        self
    }

    /// Add a bridge of `thickness` between the islands at `locations`.
    ///
    /// May cause the builder to enter a [`NotAnIsland`](BuilderInvalidReason::NotAnIsland) or
    /// [`InvalidBridge`](BuilderInvalidReason::InvalidBridge) invalid state.
    /// If the builder is already in an invalid state, this function does nothing.
    pub fn add_bridge(&mut self, locations: UnorderedPair<Location>, thickness: Thickness) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        let id_at = |location: Location| {
            if !location.within(self.board.dims) {
                return Err(BuilderInvalidReason::FeatureOutOfBounds);
            }
            self.board.island_at(location).map(|island| island.id).ok_or(BuilderInvalidReason::NotAnIsland)
        };
        let endpoints = id_at(locations.0).and_then(|a| Ok((a, id_at(locations.1)?)));

        match endpoints.and_then(|(a, b)| {
            self.board.add_bridge(a, b, thickness).map_err(BuilderInvalidReason::InvalidBridge)
        }) {
            Ok(_) => {}
            Err(reason) => self.invalid_reasons.push(reason),
        }

        self
    }

    /// Check the validity of this builder, ensuring no [`BuilderInvalidReason`] condition has arisen.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Convert the state of this builder into a [`Board`].
    /// If the builder is invalid for any reason, a reference to a [`Vec`] of [`BuilderInvalidReason`] will indicate why.
    pub fn build(&self) -> Result<Board, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        Ok(self.board.clone())
    }
}

/// Reasons a board could not be read from text or from a [`BoardRecord`].
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ParseError {
    /// Nothing but blank lines and comments.
    #[error("no board lines found")]
    Empty,
    /// Rows of differing lengths.
    #[error("line {line} has {found} cells, expected {expected}")]
    Ragged {
        /// Index of the offending row, counting board rows only.
        line: usize,
        /// Length of the first row.
        expected: usize,
        /// Length of the offending row.
        found: usize,
    },
    /// A character outside the board alphabet, or a degree outside `1..=8`.
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    /// A run of bridge cells with no island at one of its ends.
    #[error("bridge at {0} does not run between two islands")]
    DanglingBridge(Location),
    /// A run of bridge cells mixing single and double glyphs.
    #[error("bridge at {0} changes thickness part way")]
    MixedBridge(Location),
    /// A record whose island ids are not `0..n`.
    #[error("island ids must run 0, 1, 2, ... in order; found {found} at position {expected}")]
    IslandOrder {
        /// The id due at this position.
        expected: IslandId,
        /// The id actually there.
        found: IslandId,
    },
    /// A record bridge naming an island that does not exist.
    #[error("bridge refers to unknown island {0}")]
    UnknownIsland(IslandId),
    /// The board was rejected while building it.
    #[error("invalid board: {0:?}")]
    Invalid(Vec<BuilderInvalidReason>),
}

impl From<&Vec<BuilderInvalidReason>> for ParseError {
    fn from(value: &Vec<BuilderInvalidReason>) -> Self {
        Self::Invalid(value.clone())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Glyph {
    Empty,
    Island(Degree),
    Bridge { horizontal: bool, thickness: Thickness },
}

impl TryFrom<char> for Glyph {
    type Error = ParseError;

    fn try_from(value: char) -> Result<Self, Self::Error> {
        Ok(match value {
            '.' => Self::Empty,
            '-' => Self::Bridge { horizontal: true, thickness: Thickness::Single },
            '=' => Self::Bridge { horizontal: true, thickness: Thickness::Double },
            '|' => Self::Bridge { horizontal: false, thickness: Thickness::Single },
            'H' => Self::Bridge { horizontal: false, thickness: Thickness::Double },
            digit => match digit.to_digit(10) {
                Some(degree) if (1..=MAX_DEGREE as u32).contains(&degree) => Self::Island(degree as Degree),
                _ => return Err(ParseError::UnexpectedChar(digit)),
            },
        })
    }
}

/// Parses the format [`Board`]'s `Display` writes. Blank lines are skipped and `#` starts a comment.
impl FromStr for Board {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rows = s.lines()
            .map(|line| line.find('#').map_or(line, |index| &line[..index]).trim())
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().map(Glyph::try_from).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        let width = rows.first().map_or(0, Vec::len);
        if let Some((line, row)) = rows.iter().find_position(|row| row.len() != width) {
            return Err(ParseError::Ragged { line, expected: width, found: row.len() });
        }
        let (Some(width), Some(height)) = (NonZero::new(width), NonZero::new(rows.len())) else {
            return Err(ParseError::Empty);
        };

        let glyph = |location: Location| rows.get(location.1).and_then(|row| row.get(location.0)).copied();

        let mut builder = PuzzleBuilder::with_dims((width, height));
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Glyph::Island(degree) = cell {
                    builder.add_island(Location(x, y), *degree);
                }
            }
        }

        // walk each run of bridge glyphs from its first cell to the island closing it
        for (y, row) in rows.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let Glyph::Bridge { horizontal, thickness } = *cell else {
                    continue;
                };
                let (back, forward) = if horizontal { ((-1, 0), (1, 0)) } else { ((0, -1), (0, 1)) };

                let start = Location(x, y);
                match glyph(start.offset_by(back)) {
                    Some(Glyph::Island(_)) => {}
                    Some(Glyph::Bridge { horizontal: h, .. }) if h == horizontal => continue,
                    _ => return Err(ParseError::DanglingBridge(start)),
                }

                let mut end = start;
                loop {
                    end = end.offset_by(forward);
                    match glyph(end) {
                        Some(Glyph::Island(_)) => break,
                        Some(Glyph::Bridge { horizontal: h, thickness: t }) if h == horizontal => {
                            if t != thickness {
                                return Err(ParseError::MixedBridge(end));
                            }
                        }
                        _ => return Err(ParseError::DanglingBridge(start)),
                    }
                }

                builder.add_bridge(UnorderedPair(start.offset_by(back), end), thickness);
            }
        }

        Ok(builder.build()?)
    }
}

/// Serialized form of a bridge: its two endpoint ids and thickness.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BridgeRecord {
    /// One endpoint.
    pub a: IslandId,
    /// The other endpoint.
    pub b: IslandId,
    /// Number of parallel bridges.
    pub thickness: Thickness,
}

/// Serialized form of a [`Board`]. A puzzle is a record with no bridges.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoardRecord {
    /// Number of columns.
    pub width: Dimension,
    /// Number of rows.
    pub height: Dimension,
    /// Islands with their ids, locations and required degrees.
    pub islands: Vec<Island>,
    /// Realized bridges. Omitted when empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bridges: Vec<BridgeRecord>,
}

impl From<Board> for BoardRecord {
    fn from(value: Board) -> Self {
        Self {
            width: value.dims.0,
            height: value.dims.1,
            islands: value.islands.clone(),
            bridges: value.bridges().iter()
                .map(|bridge| BridgeRecord {
                    a: bridge.endpoints.0,
                    b: bridge.endpoints.1,
                    thickness: bridge.thickness,
                })
                .collect_vec(),
        }
    }
}

/// Rebuilds the board through a [`PuzzleBuilder`], so every placement and geometry check runs again.
impl TryFrom<BoardRecord> for Board {
    type Error = ParseError;

    fn try_from(value: BoardRecord) -> Result<Self, Self::Error> {
        let mut builder = PuzzleBuilder::with_dims((value.width, value.height));

        for (expected, island) in value.islands.iter().sorted_by_key(|island| island.id).enumerate() {
            if island.id != expected {
                return Err(ParseError::IslandOrder { expected, found: island.id });
            }
            builder.add_island(island.location, island.degree);
        }

        let location_of = |id: IslandId| value.islands.iter()
            .find(|island| island.id == id)
            .map(|island| island.location)
            .ok_or(ParseError::UnknownIsland(id));

        for bridge in &value.bridges {
            builder.add_bridge(UnorderedPair(location_of(bridge.a)?, location_of(bridge.b)?), bridge.thickness);
        }

        Ok(builder.build()?)
    }
}
