//! `CUSTOM_BALLISTIC_GRAV(travel steps drop)`
//!
//! Reproduces the game's bullet-gravity multiplier: the projectile direction
//! starts level, drops by `drop` each step and is renormalized, accumulating
//! rise over `steps` ticks of 0.02s. `Float64` and `Float128` results are
//! computed in double precision, everything else in single precision.

use crate::geometry::Vector2;
use crate::scalar::Scalar;
use crate::types::{PropertyType, ValueKind};
use crate::value::Evaluated;

const TICK_SECONDS: f32 = 0.02;
const GRAVITY: f32 = -9.81;

/// Gravity multiplier for a projectile with the given ballistic parameters,
/// in single precision.
pub fn ballistic_gravity_multiplier(travel: f64, steps: f64, drop: f64) -> f32 {
    let (travel, drop) = (travel as f32, drop as f32);
    let mut rise = 0.0f32;
    let mut right = Vector2::new(1.0, 0.0);
    let mut index = 0u64;
    while (index as f64) < steps {
        rise += right.y * travel;
        right.y -= drop;
        right = right.normalize();
        index += 1;
    }
    let seconds = steps as f32 * TICK_SECONDS;
    2.0 * rise / (seconds * seconds) / GRAVITY
}

/// [`ballistic_gravity_multiplier`] in double precision.
pub fn ballistic_gravity_multiplier_f64(travel: f64, steps: f64, drop: f64) -> f64 {
    let mut rise = 0.0f64;
    let (mut x, mut y) = (1.0f64, 0.0f64);
    let mut index = 0u64;
    while (index as f64) < steps {
        rise += y * travel;
        y -= drop;
        let len = (x * x + y * y).sqrt();
        x /= len;
        y /= len;
        index += 1;
    }
    let seconds = steps * 0.02;
    2.0 * rise / (seconds * seconds) / -9.81
}

fn operand(arg: &Evaluated) -> Option<Option<f64>> {
    match arg {
        Evaluated::Null => Some(None),
        Evaluated::Value(v) => match v.convert(&ValueKind::Float64.into())? {
            Scalar::Float64(v) => Some(Some(v)),
            _ => None,
        },
    }
}

pub(super) fn evaluate(
    travel: &Evaluated,
    steps: &Evaluated,
    drop: &Evaluated,
    ty: &PropertyType,
) -> Option<Evaluated> {
    let (Some(travel), Some(steps), Some(drop)) = (operand(travel)?, operand(steps)?, operand(drop)?)
    else {
        return Some(Evaluated::Null);
    };

    let multiplier = match ty.kind() {
        ValueKind::Float64 | ValueKind::Float128 => {
            Scalar::Float64(ballistic_gravity_multiplier_f64(travel, steps, drop))
        }
        _ => Scalar::Float32(ballistic_gravity_multiplier(travel, steps, drop)),
    };
    if multiplier.kind() == ty.kind() {
        return Some(Evaluated::Value(multiplier));
    }
    multiplier.convert(ty).map(Evaluated::Value)
}
