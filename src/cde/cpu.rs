//! CPU implementation of CDE solving.
//!
//! This module implements the [`CdeAlgorithms`] trait for CPU by delegating
//! to the generic implementation in `impl_generic/`.

use crate::cde::impl_generic::{CdeSolution, cdeint_impl};
use crate::cde::{CdeAlgorithms, CdeOptions, CdeResult, ControlPath, VectorField};
use numr::autograd::Var;
use numr::runtime::cpu::{CpuClient, CpuRuntime};

impl CdeAlgorithms<CpuRuntime> for CpuClient {
    fn cdeint<'a, P, V>(
        &self,
        path: &'a P,
        z0: &Var<CpuRuntime>,
        func: &'a V,
        t: &Var<CpuRuntime>,
        options: &CdeOptions,
    ) -> CdeResult<CdeSolution<'a, CpuRuntime, Self, P, V>>
    where
        P: ControlPath<CpuRuntime, Self> + ?Sized,
        V: VectorField<CpuRuntime, Self> + ?Sized,
    {
        cdeint_impl(self, path, z0, func, t, options)
    }
}
