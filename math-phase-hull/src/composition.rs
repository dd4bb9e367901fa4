//! Compositions and their normalized coordinates on the composition simplex

use crate::elements::chemical_system_label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sparse element → amount map
///
/// Amounts are expected to be non-negative. Only elements with a strictly
/// positive amount count towards the arity and the atom count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Composition(BTreeMap<String, f64>);

impl Composition {
    /// Create an empty composition
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a composition from `(element, amount)` pairs
    ///
    /// Repeated elements overwrite earlier amounts.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (S, f64)>) -> Self {
        Self(pairs.into_iter().map(|(e, a)| (e.into(), a)).collect())
    }

    /// Builder-style insertion of one element amount
    pub fn with(mut self, element: impl Into<String>, amount: f64) -> Self {
        self.0.insert(element.into(), amount);
        self
    }

    /// Amount of an element, 0 if absent
    pub fn amount(&self, element: &str) -> f64 {
        self.0.get(element).copied().unwrap_or(0.0)
    }

    /// Raw `(element, amount)` pairs in alphabetical order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(e, a)| (e.as_str(), *a))
    }

    /// Elements with a strictly positive amount, alphabetical
    pub fn elements(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, a)| *a > 0.0)
            .map(|(e, _)| e)
            .collect()
    }

    /// Number of elements with a strictly positive amount
    pub fn arity(&self) -> usize {
        self.iter().filter(|(_, a)| *a > 0.0).count()
    }

    /// Sum of all positive amounts
    pub fn atom_count(&self) -> f64 {
        self.iter().map(|(_, a)| a).filter(|a| *a > 0.0).sum()
    }

    /// Check whether every positive-amount element belongs to `elements`
    pub fn is_subset_of<S: AsRef<str>>(&self, elements: &[S]) -> bool {
        self.elements()
            .iter()
            .all(|e| elements.iter().any(|s| s.as_ref() == *e))
    }

    /// Positive-amount elements that are missing from `elements`
    pub fn elements_outside<S: AsRef<str>>(&self, elements: &[S]) -> Vec<String> {
        self.elements()
            .into_iter()
            .filter(|e| !elements.iter().any(|s| s.as_ref() == *e))
            .map(str::to_string)
            .collect()
    }

    /// Atomic fractions of the positive-amount elements
    ///
    /// Empty when the composition has no positive amount.
    pub fn fractions(&self) -> BTreeMap<String, f64> {
        let total = self.atom_count();
        if total <= 0.0 {
            return BTreeMap::new();
        }
        self.iter()
            .filter(|(_, a)| *a > 0.0)
            .map(|(e, a)| (e.to_string(), a / total))
            .collect()
    }

    /// Fractions over a declared element list, in that order
    ///
    /// Elements absent from the composition get 0. When the composition has
    /// no positive amount the result is uniform over `elements`.
    pub fn fractions_over<S: AsRef<str>>(&self, elements: &[S]) -> Vec<f64> {
        normalize_amounts(
            &elements
                .iter()
                .map(|e| self.amount(e.as_ref()).max(0.0))
                .collect::<Vec<_>>(),
        )
    }

    /// Canonical chemical-system label of the positive-amount elements
    pub fn chemical_system(&self) -> String {
        chemical_system_label(&self.elements())
    }

    /// Reduced formula-like string, e.g. `Fe2O3`
    pub fn formula(&self) -> String {
        let mut out = String::new();
        for (element, amount) in self.iter().filter(|(_, a)| *a > 0.0) {
            out.push_str(element);
            if (amount - 1.0).abs() > 1e-9 {
                if (amount - amount.round()).abs() < 1e-9 {
                    out.push_str(&format!("{}", amount.round() as i64));
                } else {
                    out.push_str(&format!("{amount}"));
                }
            }
        }
        out
    }
}

impl fmt::Display for Composition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.formula())
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for Composition {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Normalize amounts to fractions summing to 1
///
/// Non-positive totals fall back to a uniform distribution.
pub fn normalize_amounts(amounts: &[f64]) -> Vec<f64> {
    if amounts.is_empty() {
        return Vec::new();
    }
    let total: f64 = amounts.iter().filter(|a| **a > 0.0).sum();
    if total <= 0.0 || !total.is_finite() {
        let uniform = 1.0 / amounts.len() as f64;
        return vec![uniform; amounts.len()];
    }
    amounts
        .iter()
        .map(|a| if *a > 0.0 { a / total } else { 0.0 })
        .collect()
}

/// A composition projected onto an ordered element list, with its energy
#[derive(Debug, Clone, PartialEq)]
pub struct CompositionPoint {
    fractions: Vec<f64>,
    energy: f64,
}

impl CompositionPoint {
    /// Project a composition onto `elements` and attach an energy
    pub fn new<S: AsRef<str>>(composition: &Composition, elements: &[S], energy: f64) -> Self {
        Self {
            fractions: composition.fractions_over(elements),
            energy,
        }
    }

    /// Fractions over the element list (they sum to 1)
    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    /// The `arity - 1` independent coordinates (first fraction dropped)
    pub fn independent(&self) -> &[f64] {
        self.fractions.get(1..).unwrap_or(&[])
    }

    /// Energy coordinate
    pub fn energy(&self) -> f64 {
        self.energy
    }
}
