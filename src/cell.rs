use unordered_pair::UnorderedPair;

use crate::board::{IslandId, Thickness};
use crate::direction::Direction;

/// What occupies one grid location.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub(crate) enum Cell {
    Island { id: IslandId },
    // direction is always forward; see Direction::FORWARD_VARIANTS
    Bridge { endpoints: UnorderedPair<IslandId>, direction: Direction, thickness: Thickness },
    #[default]
    Empty,
}

impl Cell {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub(crate) fn is_island(&self) -> bool {
        matches!(self, Self::Island { .. })
    }

    pub(crate) fn display(&self, degree_of: impl Fn(IslandId) -> u8) -> char {
        match self {
            Self::Empty => '.',
            Self::Island { id } => std::char::from_digit(degree_of(*id) as u32, 36).unwrap_or('?'),
            Self::Bridge { direction, thickness, .. } => match (direction.is_horizontal(), thickness) {
                (true, Thickness::Single) => '-',
                (true, Thickness::Double) => '=',
                (false, Thickness::Single) => '|',
                (false, Thickness::Double) => 'H',
            },
        }
    }
}
