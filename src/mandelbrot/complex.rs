use std::ops::{Add, Mul};

use serde::{Deserialize, Serialize};

/// A point in the complex plane.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Complex {
    /// Real part
    pub real: f64,
    /// Imaginary part
    pub imag: f64,
}

impl Complex {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Construct from real and imaginary parts.
    #[must_use]
    pub const fn new(real: f64, imag: f64) -> Self {
        Self { real, imag }
    }

    /// Modulus `|z|`, computed without intermediate overflow.
    #[must_use]
    pub fn modulus(&self) -> f64 {
        self.real.hypot(self.imag)
    }

    /// Both parts are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.real.is_finite() && self.imag.is_finite()
    }
}

impl Add for Complex {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            real: self.real + other.real,
            imag: self.imag + other.imag,
        }
    }
}

impl Mul for Complex {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Self {
            real: self.real * other.real - self.imag * other.imag,
            imag: self.real * other.imag + self.imag * other.real,
        }
    }
}
