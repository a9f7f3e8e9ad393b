//! Order encoding of bounded integers into SAT.
//!
//! An integer with domain `d_0 < d_1 < ... < d_m` is represented by literals `ge[k] <=> (x >= d_{k+1})`, chained
//! so that `ge[k + 1] => ge[k]`. Bounds on a sum then become single literals, which is what makes linear constraints
//! cheap to assert and the objective cheap to tighten.

use std::ops::Not;

use itertools::Itertools;
use varisat::{ExtendFormula, Lit};

/// The truth of a bound, decided at encoding time or left to a literal.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Bound {
    True,
    False,
    Lit(Lit),
}

impl Not for Bound {
    type Output = Self;

    fn not(self) -> Self::Output {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Lit(lit) => Self::Lit(!lit),
        }
    }
}

/// Add the disjunction of `bounds`.
///
/// Returns `false` if every bound is already false, i.e. the clause can never be satisfied.
pub(crate) fn add_clause(formula: &mut impl ExtendFormula, bounds: impl IntoIterator<Item = Bound>) -> bool {
    let mut lits = Vec::new();
    for bound in bounds {
        match bound {
            Bound::True => return true,
            Bound::False => {}
            Bound::Lit(lit) => lits.push(lit),
        }
    }

    if lits.is_empty() {
        return false;
    }

    formula.add_clause(&lits);
    true
}

#[derive(Clone, Debug)]
pub(crate) struct OrderInt {
    // sorted, distinct, never empty
    values: Vec<i64>,
    ge: Vec<Lit>,
}

impl OrderInt {
    pub(crate) fn constant(value: i64) -> Self {
        Self { values: vec![value], ge: Vec::new() }
    }

    /// A fresh integer ranging over `lower..=upper`.
    pub(crate) fn range(formula: &mut impl ExtendFormula, lower: i64, upper: i64) -> Self {
        Self::over(formula, (lower..=upper).collect_vec())
    }

    fn over(formula: &mut impl ExtendFormula, values: Vec<i64>) -> Self {
        let ge = (1..values.len()).map(|_| formula.new_lit()).collect_vec();
        for (higher, lower) in ge.iter().skip(1).zip(ge.iter()) {
            formula.add_clause(&[!*higher, *lower]);
        }

        Self { values, ge }
    }

    pub(crate) fn min(&self) -> i64 {
        self.values[0]
    }

    #[cfg(test)]
    pub(crate) fn max(&self) -> i64 {
        self.values[self.values.len() - 1]
    }

    fn is_constant(&self) -> bool {
        self.ge.is_empty()
    }

    /// `x >= value`
    pub(crate) fn at_least(&self, value: i64) -> Bound {
        match self.values.partition_point(|d| *d < value) {
            0 => Bound::True,
            index if index == self.values.len() => Bound::False,
            index => Bound::Lit(self.ge[index - 1]),
        }
    }

    /// `x <= value`
    pub(crate) fn at_most(&self, value: i64) -> Bound {
        !self.at_least(value + 1)
    }

    /// `x + offset`, sharing literals with `self`.
    pub(crate) fn shift(&self, offset: i64) -> Self {
        Self {
            values: self.values.iter().map(|d| d + offset).collect_vec(),
            ge: self.ge.clone(),
        }
    }

    /// `coefficient · x`, sharing literals with `self`.
    pub(crate) fn scale(&self, coefficient: i64) -> Self {
        match coefficient {
            0 => Self::constant(0),
            c if c > 0 => Self {
                values: self.values.iter().map(|d| d * c).collect_vec(),
                ge: self.ge.clone(),
            },
            // c·x >= c·d_k holds exactly when x < d_{k+1}, so the chain runs backwards and negated
            c => Self {
                values: self.values.iter().rev().map(|d| d * c).collect_vec(),
                ge: self.ge.iter().rev().map(|lit| !*lit).collect_vec(),
            },
        }
    }

    /// A fresh integer constrained to equal `self + other`.
    pub(crate) fn add(&self, other: &Self, formula: &mut impl ExtendFormula) -> Self {
        if self.is_constant() {
            return other.shift(self.min());
        }
        if other.is_constant() {
            return self.shift(other.min());
        }

        let values = self.values.iter()
            .cartesian_product(other.values.iter())
            .map(|(a, b)| a + b)
            .sorted()
            .dedup()
            .collect_vec();
        let sum = Self::over(formula, values);

        for (a, b) in self.values.iter().cartesian_product(other.values.iter()) {
            // x >= a and y >= b give x + y >= a + b
            add_clause(formula, [!self.at_least(*a), !other.at_least(*b), sum.at_least(a + b)]);
            // x <= a and y <= b give x + y <= a + b
            add_clause(formula, [!self.at_most(*a), !other.at_most(*b), sum.at_most(a + b)]);
        }

        sum
    }

    /// Read this integer off a satisfying assignment indexed by variable.
    pub(crate) fn value(&self, model: &[bool]) -> i64 {
        let holds = |lit: &Lit| model.get(lit.var().index()).is_some_and(|truth| *truth == lit.is_positive());
        self.values[self.ge.iter().take_while(|lit| holds(lit)).count()]
    }
}

/// A fresh integer equal to the sum of `terms`, built as a balanced tree of pairwise additions.
pub(crate) fn sum(formula: &mut impl ExtendFormula, terms: Vec<OrderInt>) -> OrderInt {
    let mut layer = terms;
    if layer.is_empty() {
        return OrderInt::constant(0);
    }

    while layer.len() > 1 {
        layer = layer.chunks(2)
            .map(|pair| match pair {
                [a, b] => a.add(b, formula),
                _ => pair[0].clone(),
            })
            .collect_vec();
    }

    layer.swap_remove(0)
}

#[cfg(test)]
mod tests {
    use varisat::Solver;

    use crate::logic::{add_clause, sum, Bound, OrderInt};

    fn solve(solver: &mut Solver) -> Option<Vec<bool>> {
        if !solver.solve().unwrap() {
            return None;
        }

        let model = solver.model().unwrap();
        let mut truth = vec![false; model.len()];
        for lit in model {
            truth[lit.var().index()] = lit.is_positive();
        }
        Some(truth)
    }

    #[test]
    fn bounds_outside_the_domain_are_decided() {
        let mut solver = Solver::new();
        let x = OrderInt::range(&mut solver, 2, 5);

        assert_eq!(x.at_least(2), Bound::True);
        assert_eq!(x.at_least(6), Bound::False);
        assert_eq!(x.at_most(5), Bound::True);
        assert_eq!(x.at_most(1), Bound::False);
        assert!(matches!(x.at_least(4), Bound::Lit(_)));
    }

    #[test]
    fn sum_is_exact() {
        let mut solver = Solver::new();
        let x = OrderInt::range(&mut solver, 0, 3);
        let y = OrderInt::range(&mut solver, 0, 2);
        let total = sum(&mut solver, vec![x.clone(), y.clone()]);
        assert_eq!((total.min(), total.max()), (0, 5));

        assert!(add_clause(&mut solver, [total.at_least(5)]));
        let model = solve(&mut solver).unwrap();
        assert_eq!((x.value(&model), y.value(&model), total.value(&model)), (3, 2, 5));
    }

    #[test]
    fn negative_coefficients_flip_the_order() {
        let mut solver = Solver::new();
        let x = OrderInt::range(&mut solver, 0, 4);
        let negated = x.scale(-2);
        assert_eq!((negated.min(), negated.max()), (-8, 0));

        // -2x >= -3 leaves x <= 1, and x >= 1 pins it
        assert!(add_clause(&mut solver, [negated.at_least(-3)]));
        assert!(add_clause(&mut solver, [x.at_least(1)]));
        let model = solve(&mut solver).unwrap();
        assert_eq!(x.value(&model), 1);
        assert_eq!(negated.value(&model), -2);
    }

    #[test]
    fn contradictory_bounds_are_unsatisfiable() {
        let mut solver = Solver::new();
        let x = OrderInt::range(&mut solver, 0, 2);
        let y = OrderInt::range(&mut solver, 0, 2);
        let total = sum(&mut solver, vec![x, y, OrderInt::constant(1)]);

        assert!(!add_clause(&mut solver, [total.at_least(6)]));
        assert!(add_clause(&mut solver, [total.at_least(4)]));
        assert!(add_clause(&mut solver, [total.at_most(3)]));
        assert!(solve(&mut solver).is_none());
    }
}
