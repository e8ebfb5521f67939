use crate::complex::Complex;

/// Absolute per-component tolerance for treating two iterates as equal.
pub const PERIOD_EPSILON: f64 = 1e-4;

/// Short-cycle detector for the fast-float quadratic model.
///
/// Together with the iterate stored in the cell and the one just computed,
/// this keeps the last three iterates of an orbit. A new iterate that lands
/// on either of the two before it means a period-1 or period-2 cycle.
/// Longer cycles go unnoticed and simply keep iterating.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrbitHistory {
    previous: Option<Complex>,
}

impl OrbitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the step `current → next` and report whether `next` closes a
    /// cycle of length one or two.
    #[inline]
    pub fn closes_cycle(&mut self, current: Complex, next: Complex) -> bool {
        let hit = next.approx_eq(current, PERIOD_EPSILON)
            || self
                .previous
                .is_some_and(|prev| next.approx_eq(prev, PERIOD_EPSILON));
        self.previous = Some(current);
        hit
    }
}
