//! CUDA implementation of CDE solving.
//!
//! This module implements the [`CdeAlgorithms`] trait for CUDA by delegating
//! to the generic implementation in `impl_generic/`.

use crate::cde::impl_generic::{CdeSolution, cdeint_impl};
use crate::cde::{CdeAlgorithms, CdeOptions, CdeResult, ControlPath, VectorField};
use numr::autograd::Var;
use numr::runtime::cuda::{CudaClient, CudaRuntime};

impl CdeAlgorithms<CudaRuntime> for CudaClient {
    fn cdeint<'a, P, V>(
        &self,
        path: &'a P,
        z0: &Var<CudaRuntime>,
        func: &'a V,
        t: &Var<CudaRuntime>,
        options: &CdeOptions,
    ) -> CdeResult<CdeSolution<'a, CudaRuntime, Self, P, V>>
    where
        P: ControlPath<CudaRuntime, Self> + ?Sized,
        V: VectorField<CudaRuntime, Self> + ?Sized,
    {
        cdeint_impl(self, path, z0, func, t, options)
    }
}
