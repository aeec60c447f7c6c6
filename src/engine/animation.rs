use std::f64::consts::PI;

use nalgebra_glm as glm;

use crate::engine::matrix_stack::MatrixStack;

pub const BOUNCE_HEIGHT: f32 = 1.3;
pub const BOUNCE_PERIOD: f64 = 1.7;
const BOUNCE_PHASE: f64 = 0.9;

/// Hop offset and squash factor of the ball at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounce {
    pub translate_y: f32,
    pub scale_xz: f32,
}

impl Bounce {
    /// `t` is elapsed seconds. The phase is wrapped to one period before any
    /// trig is evaluated, so precision holds for arbitrarily long runs.
    pub fn at(t: f64) -> Self {
        let phase = (t + BOUNCE_PHASE).rem_euclid(BOUNCE_PERIOD);
        let omega = 2.0 * PI / BOUNCE_PERIOD;

        let translate_y = BOUNCE_HEIGHT as f64 * (0.5 * (omega * phase).sin() + 0.5);
        // Twice the hop frequency: flattest at ground contact, tallest at the apex
        let scale_xz = -0.5 * (0.5 * (2.0 * omega * phase).cos() + 0.5) + 1.0;

        Bounce {
            translate_y: translate_y as f32,
            scale_xz: scale_xz as f32,
        }
    }

    pub fn apply(&self, stack: &mut MatrixStack) {
        stack.translate(&glm::vec3(0.0, self.translate_y, 0.0));
        stack.scale(&glm::vec3(self.scale_xz, 1.0, self.scale_xz));
    }
}
