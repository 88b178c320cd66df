//! Exponential smoothing of windowed deltas.

use crate::window::Window;

/// Single-pole IIR low-pass: `y = (1 - alpha) * y + alpha * x`.
///
/// `alpha` is the weight of the newest sample.  1.0 passes input straight
/// through; values near 0.0 react slowly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ema {
    alpha: f32,
    value: f32,
}

impl Ema {
    pub fn new(alpha: f32) -> Self {
        Ema { alpha: alpha.clamp(0.0, 1.0), value: 0.0 }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        self.value = (1.0 - self.alpha) * self.value + self.alpha * x;
        self.value
    }

    pub fn value(&self) -> f32 { self.value }
    pub fn alpha(&self) -> f32 { self.alpha }
}

/// Smoothed per-axis velocity, in device units per window.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Smoothed {
    pub dx: f32,
    pub dy: f32,
}

/// One [`Ema`] per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Smoother {
    x: Ema,
    y: Ema,
}

impl Smoother {
    pub fn new(alpha: f32) -> Self {
        Smoother { x: Ema::new(alpha), y: Ema::new(alpha) }
    }

    pub fn update(&mut self, w: Window) -> Smoothed {
        Smoothed {
            dx: self.x.update(w.dx as f32),
            dy: self.y.update(w.dy as f32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_one_is_identity() {
        let mut e = Ema::new(1.0);
        assert_eq!(e.update(7.0), 7.0);
        assert_eq!(e.update(-3.0), -3.0);
    }

    #[test]
    fn alpha_zero_never_moves() {
        let mut e = Ema::new(0.0);
        for _ in 0..10 { e.update(100.0); }
        assert_eq!(e.value(), 0.0);
    }

    #[test]
    fn alpha_is_clamped() {
        assert_eq!(Ema::new(3.0).alpha(), 1.0);
        assert_eq!(Ema::new(-1.0).alpha(), 0.0);
    }

    #[test]
    fn converges_toward_constant_input() {
        let mut e = Ema::new(0.35);
        let first = e.update(10.0);
        assert!((first - 3.5).abs() < 1e-6);
        for _ in 0..50 { e.update(10.0); }
        assert!((e.value() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn smoother_tracks_axes_independently() {
        let mut s = Smoother::new(0.5);
        let out = s.update(Window { dx: 4, dy: -8 });
        assert_eq!(out, Smoothed { dx: 2.0, dy: -4.0 });
        let out = s.update(Window { dx: 0, dy: 0 });
        assert_eq!(out, Smoothed { dx: 1.0, dy: -2.0 });
    }
}
