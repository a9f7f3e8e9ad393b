//! The boundary to an integer/linear program solving engine.
//!
//! A [`LinearProgram`] is plain data: bounded variables, linear constraints with integer coefficients, and a linear
//! objective. Anything implementing [`Oracle`] can solve one; [`SatOracle`](crate::solver::SatOracle) is the
//! built-in implementation. `Display` writes the program in CPLEX LP format for external engines.

use std::fmt::{Display, Formatter};

use itertools::Itertools;
use thiserror::Error;

/// Handle to a variable of one [`LinearProgram`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(pub(crate) usize);

impl VarId {
    /// Position of the variable in [`LinearProgram::variables`].
    pub fn index(&self) -> usize {
        self.0
    }
}

/// The values a variable may take within its bounds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VarKind {
    /// 0 or 1, whatever the declared bounds.
    Binary,
    /// Any integer.
    Integer,
    /// Any real number.
    Continuous,
}

/// A declared variable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
    /// Name used in LP output. Unique within a program by convention only.
    pub name: String,
    /// Integrality requirement.
    pub kind: VarKind,
    /// Inclusive lower bound.
    pub lower: i64,
    /// Inclusive upper bound.
    pub upper: i64,
}

/// `Σ coefficient · variable`, with at most one term per variable.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LinearExpr {
    terms: Vec<(VarId, i64)>,
}

impl LinearExpr {
    /// The empty sum, equal to 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `coefficient · var`, merging with an existing term on `var`.
    pub fn add_term(mut self, var: VarId, coefficient: i64) -> Self {
        match self.terms.iter_mut().find(|(existing, _)| *existing == var) {
            Some((_, c)) => *c += coefficient,
            None => self.terms.push((var, coefficient)),
        }
        self
    }

    /// Terms with a non-zero coefficient.
    pub fn terms(&self) -> impl Iterator<Item = (VarId, i64)> + '_ {
        self.terms.iter().copied().filter(|(_, c)| *c != 0)
    }

    /// Value of the expression under `values`, indexed by [`VarId`]. Missing values count as 0.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms().map(|(var, c)| c as f64 * values.get(var.0).copied().unwrap_or(0.0)).sum()
    }
}

impl FromIterator<(VarId, i64)> for LinearExpr {
    fn from_iter<T: IntoIterator<Item = (VarId, i64)>>(iter: T) -> Self {
        iter.into_iter().fold(Self::new(), |expr, (var, c)| expr.add_term(var, c))
    }
}

/// Sum of the given variables, each with coefficient 1.
impl FromIterator<VarId> for LinearExpr {
    fn from_iter<T: IntoIterator<Item = VarId>>(iter: T) -> Self {
        iter.into_iter().map(|var| (var, 1)).collect()
    }
}

/// How the left hand side of a [`Constraint`] relates to its right hand side.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Comparison {
    /// `<=`
    Le,
    /// `=`
    Eq,
    /// `>=`
    Ge,
}

/// `expr <comparison> rhs`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Constraint {
    /// Label used in LP output.
    pub name: String,
    /// Left hand side.
    pub expr: LinearExpr,
    /// Relation between `expr` and `rhs`.
    pub comparison: Comparison,
    /// Right hand side.
    pub rhs: i64,
}

impl Constraint {
    /// True if `values` satisfy this constraint, within a tolerance of `1e-6`.
    pub fn holds(&self, values: &[f64]) -> bool {
        const TOLERANCE: f64 = 1e-6;
        let lhs = self.expr.evaluate(values);
        let rhs = self.rhs as f64;
        match self.comparison {
            Comparison::Le => lhs <= rhs + TOLERANCE,
            Comparison::Eq => (lhs - rhs).abs() <= TOLERANCE,
            Comparison::Ge => lhs >= rhs - TOLERANCE,
        }
    }
}

/// Direction of optimisation.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    /// Seek the smallest objective value.
    Minimize,
    /// Seek the largest objective value.
    Maximize,
}

/// The expression to optimise, and in which direction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Objective {
    /// Whether to minimise or maximise.
    pub sense: Sense,
    /// The quantity optimised.
    pub expr: LinearExpr,
}

/// Bounded variables, linear constraints and a linear objective.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LinearProgram {
    variables: Vec<Variable>,
    constraints: Vec<Constraint>,
    objective: Objective,
}

impl Default for LinearProgram {
    fn default() -> Self {
        Self::new(Sense::Minimize)
    }
}

impl LinearProgram {
    /// An empty program optimising in `sense`. The objective is 0 until [`Self::set_objective`] is called.
    pub fn new(sense: Sense) -> Self {
        Self {
            variables: Vec::new(),
            constraints: Vec::new(),
            objective: Objective { sense, expr: LinearExpr::new() },
        }
    }

    /// Declare a variable taking values in `lower..=upper`. Binary variables ignore the given bounds.
    pub fn add_var(&mut self, name: impl Into<String>, kind: VarKind, lower: i64, upper: i64) -> VarId {
        let (lower, upper) = match kind {
            VarKind::Binary => (0, 1),
            _ => (lower, upper),
        };
        self.variables.push(Variable { name: name.into(), kind, lower, upper });
        VarId(self.variables.len() - 1)
    }

    /// Require `expr <comparison> rhs`.
    pub fn add_constraint(&mut self, name: impl Into<String>, expr: LinearExpr, comparison: Comparison, rhs: i64) {
        self.constraints.push(Constraint { name: name.into(), expr, comparison, rhs });
    }

    /// Replace the objective expression, keeping its sense.
    pub fn set_objective(&mut self, expr: LinearExpr) {
        self.objective.expr = expr;
    }

    /// Every variable, indexed by [`VarId`].
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The variable behind `var`. Panics if `var` belongs to another program.
    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    /// Constraints in the order they were added.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// The objective, 0 unless set.
    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    /// True if `values` respects every bound, integrality requirement and constraint.
    pub fn is_feasible(&self, values: &[f64]) -> bool {
        const TOLERANCE: f64 = 1e-6;
        values.len() == self.variables.len()
            && self.variables.iter().zip(values).all(|(var, value)| {
                let integral = var.kind == VarKind::Continuous || (value - value.round()).abs() <= TOLERANCE;
                integral && *value >= var.lower as f64 - TOLERANCE && *value <= var.upper as f64 + TOLERANCE
            })
            && self.constraints.iter().all(|constraint| constraint.holds(values))
    }
}

/// An optimal assignment, indexed by [`VarId`].
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// One value per variable.
    pub values: Vec<f64>,
    /// Value of the objective under `values`.
    pub objective: f64,
}

impl Assignment {
    /// The value given to `var`, if there is one.
    pub fn value(&self, var: VarId) -> Option<f64> {
        self.values.get(var.0).copied()
    }
}

/// What an [`Oracle`] concluded about a program.
#[derive(Clone, Debug, PartialEq)]
pub enum OracleOutcome {
    /// An assignment no feasible assignment improves on.
    Optimal(Assignment),
    /// No assignment satisfies every bound and constraint.
    Infeasible,
}

/// Reasons an [`Oracle`] could not reach a conclusion.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum OracleError {
    /// The named variable has bounds the oracle cannot handle.
    #[error("variable {0} has an empty or unsupported domain")]
    Unbounded(String),
    /// The engine itself failed.
    #[error("solver backend failed: {0}")]
    Backend(String),
}

/// A solving engine: given a program, returns an optimal assignment or reports infeasibility.
pub trait Oracle {
    /// Optimise `program`, or show that it is infeasible.
    fn solve(&self, program: &LinearProgram) -> Result<OracleOutcome, OracleError>;
}

fn write_expr(f: &mut Formatter<'_>, program: &LinearProgram, expr: &LinearExpr) -> std::fmt::Result {
    let mut terms = expr.terms().peekable();
    if terms.peek().is_none() {
        return write!(f, "0");
    }

    for (position, (var, c)) in terms.enumerate() {
        let sign = match (position, c < 0) {
            (0, false) => "",
            (0, true) => "-",
            (_, false) => " + ",
            (_, true) => " - ",
        };
        let coefficient = if c.abs() == 1 { String::new() } else { format!("{} ", c.abs()) };
        write!(f, "{sign}{coefficient}{}", program.variable(var).name)?;
    }

    Ok(())
}

impl Display for LinearProgram {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", match self.objective.sense {
            Sense::Minimize => "Minimize",
            Sense::Maximize => "Maximize",
        })?;
        write!(f, " obj: ")?;
        write_expr(f, self, &self.objective.expr)?;
        writeln!(f)?;

        writeln!(f, "Subject To")?;
        for constraint in &self.constraints {
            write!(f, " {}: ", constraint.name)?;
            write_expr(f, self, &constraint.expr)?;
            writeln!(f, " {} {}", match constraint.comparison {
                Comparison::Le => "<=",
                Comparison::Eq => "=",
                Comparison::Ge => ">=",
            }, constraint.rhs)?;
        }

        writeln!(f, "Bounds")?;
        for var in self.variables.iter().filter(|var| var.kind != VarKind::Binary) {
            writeln!(f, " {} <= {} <= {}", var.lower, var.name, var.upper)?;
        }

        for (header, kind) in [("General", VarKind::Integer), ("Binary", VarKind::Binary)] {
            let names = self.variables.iter().filter(|var| var.kind == kind).map(|var| &var.name).join(" ");
            if !names.is_empty() {
                writeln!(f, "{header}")?;
                writeln!(f, " {names}")?;
            }
        }

        writeln!(f, "End")
    }
}
