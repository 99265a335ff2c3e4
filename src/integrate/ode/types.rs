//! Types for ODE solvers.

/// ODE solver method.
///
/// # Available Methods
///
/// | Method   | Order | Stages | Step     | Use Case |
/// |----------|-------|--------|----------|----------|
/// | Euler    | 1     | 1      | Fixed    | Debugging, piecewise-linear controls |
/// | Midpoint | 2     | 2      | Fixed    | Cheap fixed-step integration |
/// | RK4      | 4     | 4      | Fixed    | Classic fixed-step integration |
/// | RK23     | 2(3)  | 4      | Adaptive | Fast, lower accuracy |
/// | RK45     | 4(5)  | 7      | Adaptive | General purpose (recommended) |
///
/// # Choosing a Method
///
/// - **RK45**: The default choice. Works well for most non-stiff problems.
/// - **RK23**: Use when speed is more important than accuracy.
/// - **Euler / Midpoint / RK4**: Take exactly the requested step size
///   (see [`ODEOptions::step_size`]); no error control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ODEMethod {
    /// Forward Euler - first order, fixed step.
    Euler,

    /// Explicit midpoint - second order, fixed step.
    Midpoint,

    /// Classic fourth-order Runge-Kutta, fixed step.
    RK4,

    /// Bogacki-Shampine 2(3) - low accuracy, fast.
    ///
    /// 4 stages per step with the FSAL (First Same As Last) property.
    RK23,

    /// Dormand-Prince 4(5) - general purpose (default).
    ///
    /// 7 stages per step with the FSAL property, so each accepted step costs
    /// six function evaluations.
    #[default]
    RK45,
}

impl ODEMethod {
    /// Get the order of the method.
    pub fn order(&self) -> usize {
        match self {
            Self::Euler => 1,
            Self::Midpoint => 2,
            Self::RK4 => 4,
            Self::RK23 => 3,
            Self::RK45 => 5,
        }
    }

    /// Get the error estimator order (`None` for fixed-step methods).
    pub fn error_order(&self) -> Option<usize> {
        match self {
            Self::Euler | Self::Midpoint | Self::RK4 => None,
            Self::RK23 => Some(2),
            Self::RK45 => Some(4),
        }
    }

    /// Whether the method adapts its step size.
    pub fn is_adaptive(&self) -> bool {
        self.error_order().is_some()
    }
}

/// Options for ODE solvers.
#[derive(Debug, Clone)]
pub struct ODEOptions {
    /// Solver method (default: RK45)
    pub method: ODEMethod,

    /// Relative tolerance (default: 1e-3)
    pub rtol: f64,

    /// Absolute tolerance (default: 1e-6)
    pub atol: f64,

    /// Initial step size for adaptive methods (default: auto-computed)
    pub h0: Option<f64>,

    /// Step size for fixed-step methods (default: spacing of the time grid)
    pub step_size: Option<f64>,

    /// Maximum step size (default: length of the integration interval)
    pub max_step: Option<f64>,

    /// Minimum step size (default: 1e-14)
    pub min_step: Option<f64>,

    /// Maximum number of steps, accepted and rejected (default: 10000)
    pub max_steps: usize,
}

impl Default for ODEOptions {
    fn default() -> Self {
        Self {
            method: ODEMethod::default(),
            rtol: 1e-3,
            atol: 1e-6,
            h0: None,
            step_size: None,
            max_step: None,
            min_step: None,
            max_steps: 10000,
        }
    }
}

impl ODEOptions {
    /// Create options with specified tolerances.
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            ..Default::default()
        }
    }

    /// Create options with specified method.
    pub fn with_method(method: ODEMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }

    /// Create options for a fixed-step method with a given step size.
    pub fn fixed_step(method: ODEMethod, step_size: f64) -> Self {
        Self {
            method,
            step_size: Some(step_size),
            ..Default::default()
        }
    }

    /// Set the method.
    pub fn method(mut self, method: ODEMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the tolerances.
    pub fn tolerances(mut self, rtol: f64, atol: f64) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    /// Set the initial step size.
    pub fn initial_step(mut self, h0: f64) -> Self {
        self.h0 = Some(h0);
        self
    }

    /// Set the step size used by fixed-step methods.
    pub fn step_size(mut self, h: f64) -> Self {
        self.step_size = Some(h);
        self
    }

    /// Set step size bounds.
    pub fn step_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_step = Some(min);
        self.max_step = Some(max);
        self
    }

    /// Set maximum number of steps.
    pub fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = n;
        self
    }
}
