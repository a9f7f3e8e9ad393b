#![warn(missing_docs)]

//! # `hashi`
//!
//! A generator and exact solver for [Bridges](https://en.wikipedia.org/wiki/Hashiwokakero), also known as
//! Hashiwokakero.
//! Build a board with a [`PuzzleBuilder`](builder::PuzzleBuilder), parse one from text, or grow a random one with a
//! [`Generator`](generator::Generator). Then call [`solve()`](crate::Board::solve), consuming the board and yielding
//! a solved version of its puzzle.
//!
//! A puzzle is a rectangular grid of numbered islands. A solution joins islands with horizontal or vertical
//! bridges, at most two between any pair, so that every island carries exactly as many bridges as its number, no
//! two bridges cross, and all islands form one connected group.
//!
//! # Internals
//! Generation grows a board one island at a time, each new island hanging off a fresh bridge from an existing one.
//! Required degrees are read off the bridges at the end, so every generated board is a solution of its own puzzle.
//!
//! Solving expresses the puzzle as an integer linear program (a [`ConstraintModel`](model::ConstraintModel)) and
//! hands it to an [`Oracle`](program::Oracle). Given the islands N, the pairs E of islands an unobstructed straight
//! line joins, and the pairs C of elements of E whose lines cross:
//! 1. Every pair in E carries an integer thickness `b` in `0..=2` and a binary `y` marking whether any bridge is
//! present, tied together by `y <= b <= 2y`.
//! 2. The thicknesses around each island sum to its degree.
//! 3. At most one of each crossing pair in C is present.
//! 4. Connectivity is a single-commodity flow: island 0 supplies `|N| - 1` units, every other island consumes one,
//! and flow may only run along present bridges, in either direction, up to `|N| - 1` units.
//!
//! The objective minimises total thickness. Any assignment the oracle returns is checked and decoded back onto the
//! board. The built-in [`SatOracle`](solver::SatOracle) solves these programs exactly by encoding them into SAT;
//! others can be plugged in through [`solve_with()`](crate::Board::solve_with), for example by feeding the program's
//! CPLEX LP rendering to an external engine.

pub use board::{Board, Bridge, Island, Thickness};
pub use builder::PuzzleBuilder;
pub use direction::Direction;
pub use location::{Dimension, Location};

pub mod board;
pub(crate) mod cell;
pub mod decoder;
pub(crate) mod direction;
pub mod generator;
pub mod geometry;
pub(crate) mod location;
pub(crate) mod logic;
pub mod builder;
pub mod model;
pub mod program;
pub mod solver;
