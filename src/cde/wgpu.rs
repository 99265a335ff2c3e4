//! WebGPU implementation of CDE solving.
//!
//! This module implements the [`CdeAlgorithms`] trait for WebGPU by delegating
//! to the generic implementation in `impl_generic/`.
//!
//! # Limitations
//!
//! - Only F32 is supported (WGSL doesn't support F64)

use crate::cde::impl_generic::{CdeSolution, cdeint_impl};
use crate::cde::{CdeAlgorithms, CdeOptions, CdeResult, ControlPath, VectorField};
use numr::autograd::Var;
use numr::runtime::wgpu::{WgpuClient, WgpuRuntime};

impl CdeAlgorithms<WgpuRuntime> for WgpuClient {
    fn cdeint<'a, P, V>(
        &self,
        path: &'a P,
        z0: &Var<WgpuRuntime>,
        func: &'a V,
        t: &Var<WgpuRuntime>,
        options: &CdeOptions,
    ) -> CdeResult<CdeSolution<'a, WgpuRuntime, Self, P, V>>
    where
        P: ControlPath<WgpuRuntime, Self> + ?Sized,
        V: VectorField<WgpuRuntime, Self> + ?Sized,
    {
        cdeint_impl(self, path, z0, func, t, options)
    }
}
