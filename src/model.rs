//! The integer program a puzzle is solved through.

use itertools::Itertools;
use log::debug;

use crate::board::{Board, Island, IslandId, MAX_DEGREE};
use crate::geometry::{self, Connection};
use crate::program::{Comparison, LinearExpr, LinearProgram, Sense, VarId, VarKind};

/// The island supplying flow to every other island.
pub const ROOT: IslandId = 0;

/// Variables of a [`ConstraintModel`], indexed like the sets they range over.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModelVariables {
    /// `r_i`, per island.
    pub degree: Vec<VarId>,
    /// `b_ij`, per potential bridge.
    pub thickness: Vec<VarId>,
    /// `y_ij`, per potential bridge.
    pub exists: Vec<VarId>,
    /// `(f_ij, f_ji)` per potential bridge, where `i` is the lower island id.
    pub flow: Vec<(VarId, VarId)>,
}

/// The integer program whose feasible solutions are exactly the valid bridge assignments of a puzzle.
///
/// # Sets
/// * N: the islands.
/// * E: every pair of islands [`geometry::can_connect`] accepts on the bare puzzle.
/// * C: every two elements of E whose paths cross.
///
/// # Program
/// ```text
/// minimise   Σ b_ij
/// degree:    Σ_j b_ij = r_i,  r_i = deg(i)                       for all i in N
/// existence: y_ij <= b_ij <= 2 y_ij                              for all (i,j) in E
/// crossing:  y_ij + y_kl <= 1                                    for all ((i,j),(k,l)) in C
/// flow:      Σ_j f_ij - Σ_j f_ji = |N| - 1 if i is the root, -1 otherwise
/// capacity:  f_ij + f_ji <= (|N| - 1) y_ij                       for all (i,j) in E
/// ```
///
/// Degree and crossing constraints alone admit boards split into separately satisfied clusters. The flow
/// constraints fix that: the root sends one unit to every other island, and flow may only travel along realized
/// bridges, so every island must be reachable from the root.
#[derive(Clone, Debug)]
pub struct ConstraintModel {
    puzzle: Board,
    potential: Vec<Connection>,
    crossings: Vec<(usize, usize)>,
    program: LinearProgram,
    variables: ModelVariables,
}

impl ConstraintModel {
    /// Build the model for `board`. Any bridges on `board` are ignored; only islands and their degrees count.
    pub fn build(board: &Board) -> Self {
        let puzzle = board.to_puzzle();
        let potential = geometry::potential_bridges(&puzzle);
        let crossings = geometry::crossing_pairs(&potential);
        let supply = puzzle.island_count().saturating_sub(1) as i64;

        let mut program = LinearProgram::new(Sense::Minimize);

        let degree = puzzle.islands().iter()
            .map(|island| program.add_var(format!("r_{}", island.id), VarKind::Integer, 0, MAX_DEGREE as i64))
            .collect_vec();

        let mut variables = ModelVariables {
            degree,
            thickness: Vec::with_capacity(potential.len()),
            exists: Vec::with_capacity(potential.len()),
            flow: Vec::with_capacity(potential.len()),
        };
        for connection in &potential {
            let (i, j) = connection.islands();
            variables.thickness.push(program.add_var(format!("b_{i}_{j}"), VarKind::Integer, 0, 2));
            variables.exists.push(program.add_var(format!("y_{i}_{j}"), VarKind::Binary, 0, 1));
            variables.flow.push((
                program.add_var(format!("f_{i}_{j}"), VarKind::Continuous, 0, supply),
                program.add_var(format!("f_{j}_{i}"), VarKind::Continuous, 0, supply),
            ));
        }

        program.set_objective(variables.thickness.iter().copied().collect());

        for island in puzzle.islands() {
            let i = island.id;
            let incident = potential.iter()
                .enumerate()
                .filter(|(_, connection)| {
                    let (a, b) = connection.islands();
                    a == i || b == i
                })
                .map(|(index, _)| index)
                .collect_vec();

            let degree_sum = incident.iter()
                .map(|index| (variables.thickness[*index], 1))
                .collect::<LinearExpr>()
                .add_term(variables.degree[i], -1);
            program.add_constraint(format!("degree_{i}"), degree_sum, Comparison::Eq, 0);
            program.add_constraint(
                format!("required_{i}"),
                LinearExpr::new().add_term(variables.degree[i], 1),
                Comparison::Eq,
                island.degree as i64,
            );

            let net_outflow = incident.iter()
                .flat_map(|index| {
                    let (forward, backward) = variables.flow[*index];
                    let (outgoing, incoming) = if potential[*index].islands().0 == i {
                        (forward, backward)
                    } else {
                        (backward, forward)
                    };
                    [(outgoing, 1), (incoming, -1)]
                })
                .collect::<LinearExpr>();
            program.add_constraint(
                format!("flow_{i}"),
                net_outflow,
                Comparison::Eq,
                if i == ROOT { supply } else { -1 },
            );
        }

        for (index, connection) in potential.iter().enumerate() {
            let (i, j) = connection.islands();
            let (b, y) = (variables.thickness[index], variables.exists[index]);
            let (forward, backward) = variables.flow[index];

            program.add_constraint(
                format!("exists_lower_{i}_{j}"),
                LinearExpr::new().add_term(y, 1).add_term(b, -1),
                Comparison::Le,
                0,
            );
            program.add_constraint(
                format!("exists_upper_{i}_{j}"),
                LinearExpr::new().add_term(b, 1).add_term(y, -2),
                Comparison::Le,
                0,
            );
            program.add_constraint(
                format!("capacity_{i}_{j}"),
                LinearExpr::new().add_term(forward, 1).add_term(backward, 1).add_term(y, -supply),
                Comparison::Le,
                0,
            );
        }

        for (first, second) in &crossings {
            let (i, j) = potential[*first].islands();
            let (k, l) = potential[*second].islands();
            program.add_constraint(
                format!("cross_{i}_{j}_{k}_{l}"),
                LinearExpr::new().add_term(variables.exists[*first], 1).add_term(variables.exists[*second], 1),
                Comparison::Le,
                1,
            );
        }

        debug!(
            "built model with |N| = {}, |E| = {}, |C| = {}: {} variables, {} constraints",
            puzzle.island_count(),
            potential.len(),
            crossings.len(),
            program.variables().len(),
            program.constraints().len(),
        );

        Self {
            puzzle,
            potential,
            crossings,
            program,
            variables,
        }
    }

    /// The bridge-free board this model was built from.
    pub fn puzzle(&self) -> &Board {
        &self.puzzle
    }

    /// N
    pub fn islands(&self) -> &[Island] {
        self.puzzle.islands()
    }

    /// E
    pub fn potential_bridges(&self) -> &[Connection] {
        &self.potential
    }

    /// C, as index pairs into [`Self::potential_bridges`].
    pub fn crossings(&self) -> &[(usize, usize)] {
        &self.crossings
    }

    /// The program to hand to an [`Oracle`](crate::program::Oracle).
    pub fn program(&self) -> &LinearProgram {
        &self.program
    }

    /// Handles to every variable of [`Self::program`], grouped by role.
    pub fn variables(&self) -> &ModelVariables {
        &self.variables
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use crate::board::{Board, Thickness};
    use crate::location::Location;
    use crate::model::ConstraintModel;
    use crate::program::{Oracle, OracleOutcome};
    use crate::solver::SatOracle;

    fn board(width: usize, height: usize, islands: &[(usize, usize, u8)]) -> Board {
        let mut board = Board::with_dims((NonZero::new(width).unwrap(), NonZero::new(height).unwrap()));
        for (x, y, degree) in islands {
            board.add_island(Location(*x, *y), *degree).unwrap();
        }
        board
    }

    #[test]
    fn sizes_follow_the_sets() {
        let model = ConstraintModel::build(&board(3, 1, &[(0, 0, 1), (2, 0, 1)]));

        assert_eq!(model.islands().len(), 2);
        assert_eq!(model.potential_bridges().len(), 1);
        assert!(model.crossings().is_empty());
        // r per island, then b, y and two flows per potential bridge
        assert_eq!(model.program().variables().len(), 6);
        assert_eq!(model.program().constraints().len(), 9);
        assert_eq!(model.variables().flow.len(), 1);
    }

    #[test]
    fn hand_solution_is_feasible() {
        let model = ConstraintModel::build(&board(3, 1, &[(0, 0, 1), (2, 0, 1)]));

        // r_0, r_1, b_0_1, y_0_1, f_0_1, f_1_0
        assert!(model.program().is_feasible(&[1.0, 1.0, 1.0, 1.0, 1.0, 0.0]));
        // flow running the wrong way
        assert!(!model.program().is_feasible(&[1.0, 1.0, 1.0, 1.0, 0.0, 1.0]));
        // a double bridge overshoots both degrees
        assert!(!model.program().is_feasible(&[1.0, 1.0, 2.0, 1.0, 1.0, 0.0]));
    }

    #[test]
    fn existing_bridges_are_ignored() {
        let mut bridged = board(3, 3, &[(0, 1, 1), (2, 1, 1), (1, 0, 1), (1, 2, 1)]);
        bridged.add_bridge(0, 1, Thickness::Single).unwrap();

        let model = ConstraintModel::build(&bridged);
        assert_eq!(model.potential_bridges().len(), 2);
        assert_eq!(model.crossings(), &[(0, 1)]);
        assert!(model.puzzle().bridges().is_empty());
    }

    #[test]
    fn building_twice_gives_the_same_program() {
        let puzzle = board(5, 5, &[(0, 0, 3), (4, 0, 2), (0, 4, 2), (4, 4, 1), (2, 0, 2)]);

        assert_eq!(ConstraintModel::build(&puzzle).program(), ConstraintModel::build(&puzzle).program());
    }

    #[test]
    fn separately_satisfied_clusters_are_infeasible() {
        // top pair and bottom pair each satisfy their degrees alone, and any connection overshoots
        let model = ConstraintModel::build(&board(3, 3, &[(0, 0, 1), (2, 0, 1), (0, 2, 1), (2, 2, 1)]));

        assert_eq!(SatOracle.solve(model.program()), Ok(OracleOutcome::Infeasible));
    }
}
