//! The built-in [`Oracle`].

use itertools::Itertools;
use log::debug;
use varisat::Solver;

use crate::logic::{add_clause, sum, OrderInt};
use crate::program::{Assignment, Comparison, LinearExpr, LinearProgram, Oracle, OracleError, OracleOutcome, Sense};

/// Domains wider than this are refused rather than encoded.
const MAX_DOMAIN: i64 = 1 << 16;

/// An exact [`Oracle`] for programs with finite integer bounds, backed by the `varisat` SAT solver.
///
/// # Encoding
/// Every variable is order encoded over its bounds. Each constraint sums its scaled terms with a balanced tree of
/// pairwise additions and asserts the single bound literal of the total. The objective is summed the same way;
/// after each model is found, a clause demanding a strictly better objective is added and the solver is run
/// again, so the last model found before the formula becomes unsatisfiable is optimal.
///
/// Continuous variables are searched over the integers within their bounds. This loses nothing on programs whose
/// continuous part has an integral optimum whenever the integer part is fixed, such as a network flow with integral
/// supplies and capacities.
#[derive(Clone, Copy, Debug, Default)]
pub struct SatOracle;

fn linear_sum(solver: &mut Solver, vars: &[OrderInt], expr: &LinearExpr) -> OrderInt {
    let terms = expr.terms()
        .map(|(var, coefficient)| vars[var.index()].scale(coefficient))
        .collect_vec();
    sum(solver, terms)
}

fn model_truth(solver: &Solver) -> Result<Vec<bool>, OracleError> {
    let model = solver.model().ok_or_else(|| OracleError::Backend("satisfiable but no model".to_string()))?;
    let mut truth = vec![false; model.len()];
    for lit in model {
        if let Some(slot) = truth.get_mut(lit.var().index()) {
            *slot = lit.is_positive();
        }
    }
    Ok(truth)
}

impl Oracle for SatOracle {
    fn solve(&self, program: &LinearProgram) -> Result<OracleOutcome, OracleError> {
        let mut solver = Solver::new();

        let vars = program.variables().iter()
            .map(|var| {
                if var.lower > var.upper || var.upper.checked_sub(var.lower).is_none_or(|width| width > MAX_DOMAIN) {
                    return Err(OracleError::Unbounded(var.name.clone()));
                }
                Ok(OrderInt::range(&mut solver, var.lower, var.upper))
            })
            .collect::<Result<Vec<_>, _>>()?;

        for constraint in program.constraints() {
            let total = linear_sum(&mut solver, &vars, &constraint.expr);
            let satisfiable = match constraint.comparison {
                Comparison::Le => add_clause(&mut solver, [total.at_most(constraint.rhs)]),
                Comparison::Ge => add_clause(&mut solver, [total.at_least(constraint.rhs)]),
                Comparison::Eq => add_clause(&mut solver, [total.at_most(constraint.rhs)])
                    && add_clause(&mut solver, [total.at_least(constraint.rhs)]),
            };

            if !satisfiable {
                debug!("constraint {} cannot hold within the variable bounds", constraint.name);
                return Ok(OracleOutcome::Infeasible);
            }
        }

        let objective = linear_sum(&mut solver, &vars, &program.objective().expr);
        debug!("encoded {} variables and {} constraints", vars.len(), program.constraints().len());

        let mut best = None;
        loop {
            match solver.solve() {
                Ok(true) => {}
                Ok(false) => break,
                Err(error) => return Err(OracleError::Backend(error.to_string())),
            }

            let truth = model_truth(&solver)?;
            let values = vars.iter().map(|var| var.value(&truth) as f64).collect_vec();
            let value = objective.value(&truth);
            debug!("found an assignment with objective {value}");
            best = Some(Assignment { values, objective: value as f64 });

            let better = match program.objective().sense {
                Sense::Minimize => objective.at_most(value - 1),
                Sense::Maximize => objective.at_least(value + 1),
            };
            if !add_clause(&mut solver, [better]) {
                break;
            }
        }

        Ok(match best {
            Some(assignment) => OracleOutcome::Optimal(assignment),
            None => {
                debug!("program is infeasible");
                OracleOutcome::Infeasible
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::program::{Comparison, LinearExpr, LinearProgram, Oracle, OracleError, OracleOutcome, Sense, VarKind};
    use crate::solver::SatOracle;

    fn optimal(program: &LinearProgram) -> Vec<f64> {
        match SatOracle.solve(program).unwrap() {
            OracleOutcome::Optimal(assignment) => {
                assert!(program.is_feasible(&assignment.values));
                assignment.values
            }
            OracleOutcome::Infeasible => panic!("expected an optimal assignment"),
        }
    }

    #[test]
    fn minimizes() {
        let mut program = LinearProgram::new(Sense::Minimize);
        let x = program.add_var("x", VarKind::Integer, 0, 5);
        let y = program.add_var("y", VarKind::Integer, 0, 5);
        program.add_constraint("c1", [(x, 1), (y, 1)].into_iter().collect(), Comparison::Ge, 4);
        program.add_constraint("c2", [x].into_iter().collect(), Comparison::Le, 1);
        program.set_objective([(x, 1), (y, 3)].into_iter().collect());

        assert_eq!(optimal(&program), vec![1.0, 3.0]);
    }

    #[test]
    fn maximizes_with_negative_coefficients() {
        let mut program = LinearProgram::new(Sense::Maximize);
        let x = program.add_var("x", VarKind::Integer, -3, 3);
        let b = program.add_var("b", VarKind::Binary, 0, 0);
        // x - 2b = -1
        program.add_constraint("link", LinearExpr::new().add_term(x, 1).add_term(b, -2), Comparison::Eq, -1);
        program.set_objective(LinearExpr::new().add_term(x, 1));

        assert_eq!(optimal(&program), vec![1.0, 1.0]);
    }

    #[test]
    fn reports_infeasibility() {
        let mut program = LinearProgram::new(Sense::Minimize);
        let x = program.add_var("x", VarKind::Integer, 0, 2);
        let y = program.add_var("y", VarKind::Integer, 0, 2);
        program.add_constraint("sum", [x, y].into_iter().collect(), Comparison::Eq, 3);
        program.add_constraint("diff", LinearExpr::new().add_term(x, 1).add_term(y, -1), Comparison::Eq, 0);

        assert_eq!(SatOracle.solve(&program), Ok(OracleOutcome::Infeasible));
    }

    #[test]
    fn refuses_empty_domains() {
        let mut program = LinearProgram::new(Sense::Minimize);
        program.add_var("x", VarKind::Integer, 3, 1);

        assert_eq!(SatOracle.solve(&program), Err(OracleError::Unbounded("x".to_string())));
    }

    #[test]
    fn refuses_extreme_domains() {
        let mut program = LinearProgram::new(Sense::Minimize);
        program.add_var("x", VarKind::Integer, i64::MIN, i64::MAX);

        assert_eq!(SatOracle.solve(&program), Err(OracleError::Unbounded("x".to_string())));

        let mut program = LinearProgram::new(Sense::Minimize);
        program.add_var("y", VarKind::Integer, 0, 1 << 20);

        assert_eq!(SatOracle.solve(&program), Err(OracleError::Unbounded("y".to_string())));
    }
}
