use std::cmp::Ordering;

use strum::VariantArray;

use crate::location::Location;

/// The four compass directions a bridge may leave an island in.
#[derive(Copy, Clone, VariantArray, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Away from row 0.
    Down,
    /// Towards column 0.
    Left,
    /// Away from column 0.
    Right,
}

impl Direction {
    /// The static array of all "forward" directions.
    ///
    /// Stepping in a forward direction moves to a location ordered after the origin in row-major order.
    /// A bridge records its orientation as the forward direction along its axis.
    pub const FORWARD_VARIANTS: &'static [Self] = &[Self::Right, Self::Down];

    /// Unit offset of one step, as `(dx, dy)`.
    pub fn delta(&self) -> (isize, isize) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Attempt `steps` steps from `location` in the direction specified by `self` and return the resultant [`Location`].
    ///
    /// The result may lie outside the board; callers check bounds.
    pub fn attempt_from(&self, location: Location, steps: usize) -> Location {
        let (dx, dy) = self.delta();
        let steps = steps as isize;
        location.offset_by((dx * steps, dy * steps))
    }

    /// Invert the direction specified by `self`.
    pub fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Convert `self` to a forward direction, if it is not already one.
    pub fn ensure_forward(&self) -> Self {
        match Self::FORWARD_VARIANTS.contains(self) {
            true => *self,
            false => self.invert(),
        }
    }

    /// True for [`Self::Left`] and [`Self::Right`].
    pub fn is_horizontal(&self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }

    /// The direction leading from `a` to `b` along a shared row or column, at any distance.
    ///
    /// Returns [`None`] if `a == b` or the two locations share neither row nor column.
    pub fn between(a: Location, b: Location) -> Option<Self> {
        match (a.0.cmp(&b.0), a.1.cmp(&b.1)) {
            (Ordering::Equal, Ordering::Less) => Some(Self::Down),
            (Ordering::Equal, Ordering::Greater) => Some(Self::Up),
            (Ordering::Less, Ordering::Equal) => Some(Self::Right),
            (Ordering::Greater, Ordering::Equal) => Some(Self::Left),
            _ => None,
        }
    }

    /// Get all orthogonal neighbors of `location` in "theory", by attempting a single step in every direction.
    pub fn neighbors_of(location: Location) -> impl Iterator<Item = (Self, Location)> {
        Self::VARIANTS.iter().map(move |dir| (*dir, dir.attempt_from(location, 1)))
    }
}
