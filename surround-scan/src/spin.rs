/// Constant-rate rotation used to turn an agent through a scan
use bevy::prelude::*;
use constants::scan::SPIN_MAX_SPEED_DEGREES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpinAxis {
    X,
    #[default]
    Y,
    Z,
}

impl SpinAxis {
    pub fn vector(self) -> Vec3 {
        match self {
            SpinAxis::X => Vec3::X,
            SpinAxis::Y => Vec3::Y,
            SpinAxis::Z => Vec3::Z,
        }
    }
}

/// Rotates the entity about one of its local axes at
/// `max_speed_degrees * amount` degrees per second.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
#[require(Transform)]
pub struct SpinDriver {
    amount: f32,
    pub reverse: bool,
    pub axis: SpinAxis,
    pub max_speed_degrees: f32,
}

impl Default for SpinDriver {
    fn default() -> Self {
        Self {
            amount: 1.0,
            reverse: false,
            axis: SpinAxis::default(),
            max_speed_degrees: SPIN_MAX_SPEED_DEGREES,
        }
    }
}

impl SpinDriver {
    pub fn new(amount: f32) -> Self {
        let mut driver = Self::default();
        driver.set_amount(amount);
        driver
    }

    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Clamped to [0, 1].
    pub fn set_amount(&mut self, amount: f32) {
        self.amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 1.0) };
    }

    /// Signed speed in degrees per second.
    pub fn degrees_per_second(&self) -> f32 {
        let speed = self.max_speed_degrees * self.amount;
        if self.reverse { -speed } else { speed }
    }
}

pub struct SpinPlugin;

impl Plugin for SpinPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, apply_spin);
    }
}

/// Without a clock nothing turns.
pub fn apply_spin(time: Option<Res<Time>>, mut spinners: Query<(&SpinDriver, &mut Transform)>) {
    let Some(time) = time else {
        return;
    };
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (driver, mut transform) in &mut spinners {
        let angle = (driver.degrees_per_second() * dt).to_radians();
        if angle != 0.0 {
            transform.rotate_local(Quat::from_axis_angle(driver.axis.vector(), angle));
        }
    }
}
