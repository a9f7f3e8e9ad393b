//! Turning an oracle's answer back into a solved board.

use log::debug;
use thiserror::Error;

use crate::board::{Board, SolutionViolation, Thickness};
use crate::model::ConstraintModel;
use crate::program::{Oracle, OracleError, OracleOutcome};
use crate::solver::SatOracle;

/// Reasons a puzzle could not be solved.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SolveError {
    /// No assignment of bridges satisfies the puzzle.
    #[error("the puzzle has no solution")]
    Infeasible,
    /// The oracle returned an assignment that does not describe a valid board.
    #[error("the oracle returned an inconsistent solution: {0}")]
    InconsistentSolution(String),
    /// The oracle could not reach a conclusion.
    #[error(transparent)]
    Oracle(#[from] OracleError),
}

impl From<SolutionViolation> for SolveError {
    fn from(value: SolutionViolation) -> Self {
        Self::InconsistentSolution(value.to_string())
    }
}

const TOLERANCE: f64 = 1e-6;

/// Read a solved board off the oracle's answer to `model`.
///
/// The assignment is checked against the program first, then every potential bridge with a non-zero thickness is
/// realized on a copy of the model's puzzle, and finally the resulting board is checked as a solution.
pub fn decode(model: &ConstraintModel, outcome: OracleOutcome) -> Result<Board, SolveError> {
    let assignment = match outcome {
        OracleOutcome::Optimal(assignment) => assignment,
        OracleOutcome::Infeasible => return Err(SolveError::Infeasible),
    };

    if !model.program().is_feasible(&assignment.values) {
        return Err(SolveError::InconsistentSolution("assignment violates the program".to_string()));
    }

    let mut board = model.puzzle().clone();
    for (connection, var) in model.potential_bridges().iter().zip(&model.variables().thickness) {
        let value = assignment.value(*var)
            .ok_or_else(|| SolveError::InconsistentSolution(format!("no value for {}", model.program().variable(*var).name)))?;
        let count = value.round();
        if (value - count).abs() > TOLERANCE {
            return Err(SolveError::InconsistentSolution(format!("fractional thickness {value}")));
        }
        if count == 0.0 {
            continue;
        }

        let thickness = Thickness::from_count(count as i64)
            .ok_or_else(|| SolveError::InconsistentSolution(format!("thickness {count} out of range")))?;
        let (a, b) = connection.islands();
        board.add_bridge(a, b, thickness)
            .map_err(|error| SolveError::InconsistentSolution(error.to_string()))?;
    }

    board.check_solution()?;
    debug!("decoded {} bridges, objective {}", board.bridges().len(), assignment.objective);

    Ok(board)
}

impl Board {
    /// Solve the puzzle formed by this board's islands with the built-in [`SatOracle`].
    /// Any bridges already on the board are discarded.
    pub fn solve(self) -> Result<Self, SolveError> {
        self.solve_with(&SatOracle)
    }

    /// Solve the puzzle formed by this board's islands with `oracle`.
    pub fn solve_with<O: Oracle>(self, oracle: &O) -> Result<Self, SolveError> {
        let model = ConstraintModel::build(&self);
        let outcome = oracle.solve(model.program())?;
        decode(&model, outcome)
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use crate::board::{Board, Thickness};
    use crate::decoder::{decode, SolveError};
    use crate::location::Location;
    use crate::model::ConstraintModel;
    use crate::program::{Assignment, LinearProgram, Oracle, OracleError, OracleOutcome};

    struct Fixed(Result<OracleOutcome, OracleError>);

    impl Oracle for Fixed {
        fn solve(&self, _: &LinearProgram) -> Result<OracleOutcome, OracleError> {
            self.0.clone()
        }
    }

    fn pair() -> Board {
        let mut board = Board::with_dims((NonZero::new(4).unwrap(), NonZero::new(1).unwrap()));
        board.add_island(Location(0, 0), 2).unwrap();
        board.add_island(Location(3, 0), 2).unwrap();
        board
    }

    #[test]
    fn decodes_a_double_bridge() {
        let model = ConstraintModel::build(&pair());
        // r_0, r_1, b_0_1, y_0_1, f_0_1, f_1_0
        let outcome = OracleOutcome::Optimal(Assignment { values: vec![2.0, 2.0, 2.0, 1.0, 1.0, 0.0], objective: 2.0 });

        let solved = decode(&model, outcome).unwrap();
        assert_eq!(solved.bridge_between(0, 1), Some(Thickness::Double));
        assert_eq!(solved.to_string(), "2==2\n");
    }

    #[test]
    fn rejects_assignments_outside_the_program() {
        let model = ConstraintModel::build(&pair());
        let outcome = OracleOutcome::Optimal(Assignment { values: vec![2.0, 2.0, 1.0, 1.0, 1.0, 0.0], objective: 1.0 });

        assert!(matches!(decode(&model, outcome), Err(SolveError::InconsistentSolution(_))));
    }

    #[test]
    fn passes_oracle_conclusions_through() {
        assert_eq!(pair().solve_with(&Fixed(Ok(OracleOutcome::Infeasible))).unwrap_err(), SolveError::Infeasible);

        let failure = OracleError::Backend("unavailable".to_string());
        assert_eq!(pair().solve_with(&Fixed(Err(failure.clone()))).unwrap_err(), SolveError::Oracle(failure));
    }

    #[test]
    fn solves_with_the_built_in_oracle() {
        let solved = pair().solve().unwrap();
        assert!(solved.is_solved());
        assert_eq!(solved.bridges().len(), 1);
    }
}
