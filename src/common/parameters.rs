//! Named parameter sets.
//!
//! Every right-hand-side evaluation receives its differentiable inputs through
//! a [`ParameterSet`] instead of capturing them. This lets the solvers decide
//! how each parameter is bound for a particular evaluation:
//!
//! - the direct solver passes the caller's own `Var`s, so reverse-mode autograd
//!   reaches them (and anything they were computed from);
//! - the adjoint solver rebinds every entry to a fresh leaf, so a single
//!   backward pass yields `aᵀ · ∂f/∂θ` for each parameter, including non-leaf
//!   tensors that a control path computed from its data;
//! - diagnostic evaluations use detached copies that never enter a graph.
//!
//! Entries are stored as aliases of the registered variables (see
//! [`alias`]), so a gradient looked up through the set is keyed exactly like
//! the caller's own `Var`.

use numr::autograd::Var;
use numr::error::{Error, Result};
use numr::runtime::Runtime;
use numr::tensor::Tensor;

use super::jacobian::alias;

/// Ordered collection of named differentiable tensors.
pub struct ParameterSet<R: Runtime> {
    entries: Vec<(String, Var<R>)>,
}

impl<R: Runtime> Clone for ParameterSet<R> {
    /// Copies keep the identity of every entry.
    fn clone(&self) -> Self {
        self.map_vars(alias)
    }
}

impl<R: Runtime> Default for ParameterSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runtime> ParameterSet<R> {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a parameter (builder style).
    pub fn with(mut self, name: impl Into<String>, var: &Var<R>) -> Self {
        self.insert(name, var);
        self
    }

    /// Register a parameter, keeping the identity of `var`.
    ///
    /// Names are not checked here; see [`ParameterSet::first_duplicate`].
    pub fn insert(&mut self, name: impl Into<String>, var: &Var<R>) {
        self.entries.push((name.into(), alias(var)));
    }

    /// Append every entry of `other`, keeping order.
    pub fn extend(&mut self, other: ParameterSet<R>) {
        self.entries.extend(other.entries);
    }

    /// Look up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&Var<R>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, var)| var)
    }

    /// Look up a parameter by name, failing with a numr error if it is missing.
    ///
    /// Intended for use inside `ControlPath` / `VectorField` implementations.
    pub fn require(&self, name: &str) -> Result<&Var<R>> {
        self.get(name).ok_or_else(|| Error::InvalidArgument {
            arg: "params",
            reason: format!("parameter '{}' is not registered", name),
        })
    }

    /// Iterate over `(name, var)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Var<R>)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Parameter names in insertion order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First name that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<&str> {
        self.entries.iter().enumerate().find_map(|(i, (name, _))| {
            self.entries[..i]
                .iter()
                .any(|(prev, _)| prev == name)
                .then_some(name.as_str())
        })
    }

    /// Copy of the set where no entry tracks gradients.
    pub fn detached(&self) -> Self {
        self.map_vars(Var::detach)
    }

    /// Copy of the set where every entry is a fresh leaf that requires grad.
    ///
    /// Gradients computed against the copy are keyed by the new leaves, so the
    /// caller must look them up through the returned set.
    pub fn as_leaves(&self) -> Self {
        self.map_vars(|var| Var::new(var.tensor().clone(), true))
    }

    fn map_vars<F>(&self, f: F) -> Self
    where
        F: Fn(&Var<R>) -> Var<R>,
    {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(name, var)| (name.clone(), f(var)))
                .collect(),
        }
    }
}

/// Gradients keyed by parameter name, in the order of the originating
/// [`ParameterSet`].
#[derive(Debug, Clone)]
pub struct GradientSet<R: Runtime> {
    entries: Vec<(String, Tensor<R>)>,
}

impl<R: Runtime> Default for GradientSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Runtime> GradientSet<R> {
    /// Create an empty gradient set.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Pair parameter names with gradients (same order as `params`).
    pub(crate) fn from_parameters(params: &ParameterSet<R>, grads: Vec<Tensor<R>>) -> Self {
        debug_assert_eq!(params.len(), grads.len());
        Self {
            entries: params
                .names()
                .into_iter()
                .map(String::from)
                .zip(grads)
                .collect(),
        }
    }

    /// Gradient for the named parameter.
    pub fn get(&self, name: &str) -> Option<&Tensor<R>> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, grad)| grad)
    }

    /// Iterate over `(name, gradient)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor<R>)> {
        self.entries.iter().map(|(n, g)| (n.as_str(), g))
    }

    /// Number of gradients.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
