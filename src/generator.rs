//! Random boards that solve their own puzzles.

use std::num::NonZero;

use itertools::Itertools;
use log::{debug, trace};
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strum::VariantArray;
use thiserror::Error;

use crate::board::{Board, Degree, IslandId, Thickness, MAX_DEGREE};
use crate::cell::Cell;
use crate::direction::Direction;
use crate::location::{Dimension, Location};

/// Preset [`DifficultyProfile`]s.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, VariantArray, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Sparse islands, degrees up to 8, doubles drawn more often than singles.
    Easy,
    /// Degrees up to 7, singles and doubles equally likely.
    #[default]
    Medium,
    /// Degrees up to 6, singles favoured.
    Hard,
    /// Dense islands, degrees up to 5, short bridges favoured.
    Extreme,
}

impl Difficulty {
    /// The generation settings this preset stands for.
    pub fn profile(&self) -> DifficultyProfile {
        let (max_degree, single_bridge_odds, island_density, shorter_bridges) = match self {
            Self::Easy => (8, 0.45, 5.5, false),
            Self::Medium => (7, 0.5, 4.5, false),
            Self::Hard => (6, 0.55, 3.5, false),
            Self::Extreme => (5, 0.6, 2.5, true),
        };

        DifficultyProfile { max_degree, single_bridge_odds, island_density, shorter_bridges }
    }
}

/// How a [`Generator`] draws each expansion.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    /// No island grows past this many bridges.
    pub max_degree: Degree,
    /// Probability of drawing a single rather than a double bridge, when a double would still fit.
    pub single_bridge_odds: f64,
    /// Grid cells per island aimed for. Lower is denser.
    pub island_density: f64,
    /// Take the shorter of two drawn lengths.
    pub shorter_bridges: bool,
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Difficulty::default().profile()
    }
}

/// Everything a [`Generator`] needs to know. Missing fields deserialize to their [`Default`] values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Number of columns, at least 3.
    pub width: usize,
    /// Number of rows, at least 3.
    pub height: usize,
    /// How expansions are drawn.
    pub profile: DifficultyProfile,
    /// Attempts, each growing a board from scratch, before giving up.
    pub max_attempts: usize,
    /// Expansion steps allowed per targeted island in one attempt.
    pub cycles_per_island: usize,
    /// Added to the cells-per-island density after an attempt falls short of its target.
    pub density_decay: f64,
    /// The island target never drops below this.
    pub min_islands: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self::new(7, 7, Difficulty::default())
    }
}

impl GeneratorConfig {
    /// A `width` by `height` board using the `difficulty` preset and default limits.
    pub fn new(width: usize, height: usize, difficulty: Difficulty) -> Self {
        Self {
            width,
            height,
            profile: difficulty.profile(),
            max_attempts: 1000,
            cycles_per_island: 10,
            density_decay: 0.01,
            min_islands: 4,
        }
    }

    /// Check every setting is usable, returning [`GenerationFailure::InvalidConfig`] naming the first that is not.
    pub fn validate(&self) -> Result<(), GenerationFailure> {
        let invalid = |reason: &str| Err(GenerationFailure::InvalidConfig(reason.to_string()));

        if self.width < 3 || self.height < 3 {
            return invalid("boards must be at least 3 cells in each direction");
        }
        if !(0.0..=1.0).contains(&self.profile.single_bridge_odds) {
            return invalid("single bridge odds must lie in [0, 1]");
        }
        if !(self.profile.island_density > 0.0) {
            return invalid("island density must be positive");
        }
        if !(1..=MAX_DEGREE).contains(&self.profile.max_degree) {
            return invalid("max degree must lie in 1..=8");
        }
        if self.max_attempts == 0 {
            return invalid("at least one attempt is required");
        }
        if !(self.density_decay >= 0.0) {
            return invalid("density decay must not be negative");
        }

        Ok(())
    }
}

/// Reasons a [`Generator`] could not produce a board.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum GenerationFailure {
    /// The configuration was rejected before any attempt.
    #[error("invalid generator configuration: {0}")]
    InvalidConfig(String),
    /// Every attempt was discarded.
    #[error("no acceptable board after {attempts} attempts")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: usize,
    },
}

/// Result of one expansion step from a frontier island.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Expansion {
    Placed(IslandId),
    /// The island can never expand again and leaves the frontier.
    Exhausted,
    /// This draw failed; the island may still expand later.
    Rejected,
}

/// Grows random boards that are valid solutions of their own puzzles.
///
/// Starting from a single island, each step picks an island from the frontier, an open direction, a thickness and
/// a length, then places a new island at the end of the new bridge. Required degrees are read off the bridges at
/// the end, so every board returned is its own solution. See [`Generator::generate`] for when a board is accepted.
pub struct Generator<R: Rng = SmallRng> {
    config: GeneratorConfig,
    dims: (Dimension, Dimension),
    rng: R,
}

impl Generator<SmallRng> {
    /// A generator seeded from the operating system.
    pub fn new(config: GeneratorConfig) -> Result<Self, GenerationFailure> {
        Self::with_rng(config, SmallRng::from_os_rng())
    }

    /// A generator producing the same sequence of boards for the same `seed` and `config`.
    pub fn seeded(config: GeneratorConfig, seed: u64) -> Result<Self, GenerationFailure> {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Generator<R> {
    /// A generator drawing from `rng`. Fails if `config` does not validate.
    pub fn with_rng(config: GeneratorConfig, rng: R) -> Result<Self, GenerationFailure> {
        config.validate()?;
        let (Some(width), Some(height)) = (NonZero::new(config.width), NonZero::new(config.height)) else {
            return Err(GenerationFailure::InvalidConfig("empty board".to_string()));
        };

        Ok(Self { config, dims: (width, height), rng })
    }

    /// The configuration in use.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a solved board.
    ///
    /// Each attempt grows a fresh board towards `max(min_islands, floor(area / density))` islands. An attempt
    /// falling short of that count relaxes the density for the next one; an attempt leaving an outer row or
    /// column without islands is discarded as is. Fails once `max_attempts` attempts have been discarded.
    pub fn generate(&mut self) -> Result<Board, GenerationFailure> {
        let area = (self.config.width * self.config.height) as f64;
        let mut density = self.config.profile.island_density;

        for attempt in 1..=self.config.max_attempts {
            let target = ((area / density).floor() as usize).max(self.config.min_islands);
            let mut board = self.grow(target);

            if board.island_count() < target {
                debug!("attempt {attempt}: {} of {target} islands placed", board.island_count());
                density += self.config.density_decay;
                continue;
            }
            if board.is_degenerate() {
                debug!("attempt {attempt}: an outer row or column has no island");
                continue;
            }

            board.settle_degrees();
            debug!("attempt {attempt}: accepted {} islands and {} bridges", board.island_count(), board.bridges().len());
            return Ok(board);
        }

        Err(GenerationFailure::RetriesExhausted { attempts: self.config.max_attempts })
    }

    fn grow(&mut self, target: usize) -> Board {
        let mut board = Board::with_dims(self.dims);
        let start = Location(self.rng.random_range(0..self.dims.0.get()), self.rng.random_range(0..self.dims.1.get()));
        let mut frontier = match board.add_island(start, 0) {
            Ok(island) => vec![island.id],
            Err(_) => return board,
        };

        for _ in 0..target * self.config.cycles_per_island {
            if frontier.is_empty() || board.island_count() >= target {
                break;
            }

            let slot = self.rng.random_range(0..frontier.len());
            match self.expand(&mut board, frontier[slot]) {
                Expansion::Placed(id) => frontier.push(id),
                Expansion::Exhausted => {
                    frontier.swap_remove(slot);
                }
                Expansion::Rejected => {}
            }
        }

        board
    }

    fn expand(&mut self, board: &mut Board, id: IslandId) -> Expansion {
        let profile = self.config.profile;
        let Some(origin) = board.island(id).map(|island| island.location) else {
            return Expansion::Exhausted;
        };

        let degree = board.realized_degree(id);
        if degree >= profile.max_degree {
            return Expansion::Exhausted;
        }

        // a new island needs at least one bridge cell and a free cell beyond it
        let is_free = |location: Location| board.cell(location).is_some_and(Cell::is_empty);
        let open = Direction::VARIANTS.iter()
            .copied()
            .filter(|direction| (1..=2).all(|steps| is_free(direction.attempt_from(origin, steps))))
            .collect_vec();
        let Some(direction) = open.choose(&mut self.rng).copied() else {
            return Expansion::Exhausted;
        };

        let thickness = if profile.max_degree - degree >= 2 && !self.rng.random_bool(profile.single_bridge_odds) {
            Thickness::Double
        } else {
            Thickness::Single
        };

        let max_length = 1 + (3..)
            .map(|steps| direction.attempt_from(origin, steps))
            .take_while(|location| is_free(*location))
            .count();
        let length = match profile.shorter_bridges {
            true => self.rng.random_range(1..=max_length).min(self.rng.random_range(1..=max_length)),
            false => self.rng.random_range(1..=max_length),
        };

        let location = direction.attempt_from(origin, length + 1);
        if board.has_island_neighbor(location) {
            trace!("rejected {location}: next to an existing island");
            return Expansion::Rejected;
        }

        let island = match board.add_island(location, 0) {
            Ok(island) => island,
            Err(error) => {
                trace!("rejected {location}: {error}");
                return Expansion::Rejected;
            }
        };
        if let Err(error) = board.add_bridge(id, island.id, thickness) {
            trace!("rejected bridge from {origin} to {location}: {error}");
            board.pop_island();
            return Expansion::Rejected;
        }

        Expansion::Placed(island.id)
    }
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use strum::VariantArray;

    use crate::cell::Cell;
    use crate::direction::Direction;
    use crate::generator::{Difficulty, GenerationFailure, Generator, GeneratorConfig};

    #[test]
    fn generated_boards_solve_themselves() {
        for difficulty in Difficulty::VARIANTS {
            for seed in 0..20 {
                let config = GeneratorConfig::new(7, 7, *difficulty);
                let board = Generator::seeded(config, seed).unwrap().generate().unwrap();

                assert_eq!(board.check_solution(), Ok(()), "{difficulty:?} seed {seed}:\n{board}");
                assert!(!board.is_degenerate());
                assert!(board.island_count() >= 4);
                assert!(board.islands().iter().all(|island| (1..=difficulty.profile().max_degree).contains(&island.degree)));
            }
        }
    }

    #[test]
    fn islands_never_touch() {
        for seed in 0..20 {
            let board = Generator::seeded(GeneratorConfig::new(9, 6, Difficulty::Extreme), seed)
                .unwrap()
                .generate()
                .unwrap();

            for island in board.islands() {
                let touching = Direction::neighbors_of(island.location)
                    .filter(|(_, neighbor)| board.cell(*neighbor).is_some_and(Cell::is_island))
                    .collect_vec();
                assert!(touching.is_empty(), "seed {seed}:\n{board}");
            }
        }
    }

    #[test]
    fn same_seed_same_board() {
        let config = GeneratorConfig::new(8, 8, Difficulty::Hard);
        let first = Generator::seeded(config.clone(), 42).unwrap().generate().unwrap();
        let second = Generator::seeded(config, 42).unwrap().generate().unwrap();

        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn invalid_configs_are_refused() {
        let too_small = GeneratorConfig::new(2, 7, Difficulty::Easy);
        assert!(matches!(Generator::seeded(too_small, 0), Err(GenerationFailure::InvalidConfig(_))));

        let mut odds = GeneratorConfig::default();
        odds.profile.single_bridge_odds = 1.5;
        assert!(matches!(Generator::seeded(odds, 0), Err(GenerationFailure::InvalidConfig(_))));

        let mut degree = GeneratorConfig::default();
        degree.profile.max_degree = 9;
        assert!(matches!(degree.validate(), Err(GenerationFailure::InvalidConfig(_))));

        let mut attempts = GeneratorConfig::default();
        attempts.max_attempts = 0;
        assert!(matches!(attempts.validate(), Err(GenerationFailure::InvalidConfig(_))));
    }

    #[test]
    fn unreachable_targets_exhaust_retries() {
        let mut config = GeneratorConfig::new(3, 3, Difficulty::Easy);
        config.min_islands = 9;
        config.max_attempts = 5;

        assert_eq!(
            Generator::seeded(config, 7).unwrap().generate().unwrap_err(),
            GenerationFailure::RetriesExhausted { attempts: 5 },
        );
    }
}
