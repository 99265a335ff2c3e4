//! Butcher tableaux for the explicit Runge-Kutta methods.

use crate::integrate::ODEMethod;

/// Coefficients of an explicit Runge-Kutta method.
///
/// `a[i]` holds the `i` coupling coefficients of stage `i`. For methods with an
/// embedded error estimate, `e` holds one weight per stage plus one for the
/// FSAL stage f(t + h, y_new), which doubles as the first stage of the next
/// step.
#[derive(Debug)]
pub struct Tableau {
    pub c: &'static [f64],
    pub a: &'static [&'static [f64]],
    pub b: &'static [f64],
    pub e: Option<&'static [f64]>,
    pub error_order: usize,
}

impl Tableau {
    /// Tableau for the given method.
    pub fn for_method(method: ODEMethod) -> &'static Tableau {
        match method {
            ODEMethod::Euler => &EULER,
            ODEMethod::Midpoint => &MIDPOINT,
            ODEMethod::RK4 => &RK4,
            ODEMethod::RK23 => &BOGACKI_SHAMPINE,
            ODEMethod::RK45 => &DORMAND_PRINCE,
        }
    }

    /// Number of stages (excluding the FSAL stage).
    pub fn stages(&self) -> usize {
        self.b.len()
    }

    /// Whether the method carries an embedded error estimate.
    pub fn is_adaptive(&self) -> bool {
        self.e.is_some()
    }
}

static EULER: Tableau = Tableau {
    c: &[0.0],
    a: &[&[]],
    b: &[1.0],
    e: None,
    error_order: 1,
};

static MIDPOINT: Tableau = Tableau {
    c: &[0.0, 0.5],
    a: &[&[], &[0.5]],
    b: &[0.0, 1.0],
    e: None,
    error_order: 2,
};

static RK4: Tableau = Tableau {
    c: &[0.0, 0.5, 0.5, 1.0],
    a: &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
    b: &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
    e: None,
    error_order: 4,
};

// Bogacki-Shampine coefficients
static BOGACKI_SHAMPINE: Tableau = Tableau {
    c: &[0.0, 1.0 / 2.0, 3.0 / 4.0],
    a: &[&[], &[1.0 / 2.0], &[0.0, 3.0 / 4.0]],
    b: &[2.0 / 9.0, 1.0 / 3.0, 4.0 / 9.0],
    // 3rd order - embedded 2nd order
    e: Some(&[-5.0 / 72.0, 1.0 / 12.0, 1.0 / 9.0, -1.0 / 8.0]),
    error_order: 2,
};

// Dormand-Prince coefficients
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th order weights (b2 = 0)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Error weights (5th - 4th order, e2 = 0)
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

static DORMAND_PRINCE: Tableau = Tableau {
    c: &[0.0, C2, C3, C4, C5, 1.0],
    a: &[
        &[],
        &[A21],
        &[A31, A32],
        &[A41, A42, A43],
        &[A51, A52, A53, A54],
        &[A61, A62, A63, A64, A65],
    ],
    b: &[B1, 0.0, B3, B4, B5, B6],
    e: Some(&[E1, 0.0, E3, E4, E5, E6, E7]),
    error_order: 4,
};
