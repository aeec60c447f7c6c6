use crate::config::CameraConfig;
use crate::engine::matrix_stack::MatrixStack;
use nalgebra_glm as glm;

const MIN_DISTANCE: f32 = 0.01;

/// What a drag does, picked from the modifiers held at press time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragMode {
    Orbit,
    Pan,
    Zoom,
}

impl DragMode {
    pub fn from_modifiers(shift: bool, ctrl: bool, alt: bool) -> Self {
        if shift {
            DragMode::Pan
        } else if ctrl || alt {
            DragMode::Zoom
        } else {
            DragMode::Orbit
        }
    }
}

/// Orbit camera looking at the origin from `distance` away.
pub struct Camera {
    pub yaw: f32,
    pub pitch: f32,
    pub pan: glm::Vec2,
    pub distance: f32,
    pub aspect: f32,

    fovy: f32,
    znear: f32,
    zfar: f32,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,

    anchor: glm::Vec2,
    mode: DragMode,
}

impl Camera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            pan: glm::Vec2::zeros(),
            distance: config.initial_distance.abs().max(MIN_DISTANCE),
            aspect: 1.0,
            fovy: config.fovy_degrees.to_radians(),
            znear: config.znear,
            zfar: config.zfar,
            rotate_speed: config.rotate_speed,
            pan_speed: config.pan_speed,
            zoom_speed: config.zoom_speed,
            anchor: glm::Vec2::zeros(),
            mode: DragMode::Orbit,
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn on_press(&mut self, x: f32, y: f32, shift: bool, ctrl: bool, alt: bool) {
        self.anchor = glm::vec2(x, y);
        self.mode = DragMode::from_modifiers(shift, ctrl, alt);
    }

    pub fn on_drag(&mut self, x: f32, y: f32) {
        let current = glm::vec2(x, y);
        let delta = current - self.anchor;
        self.anchor = current;

        match self.mode {
            DragMode::Orbit => {
                self.yaw += self.rotate_speed * delta.x;
                self.pitch += self.rotate_speed * delta.y;
            }
            DragMode::Pan => {
                // Screen y grows downwards
                self.pan.x += self.pan_speed * delta.x;
                self.pan.y -= self.pan_speed * delta.y;
            }
            DragMode::Zoom => {
                let factor = 1.0 - self.zoom_speed * delta.y;
                self.distance = (self.distance * factor).max(MIN_DISTANCE);
            }
        }
    }

    pub fn apply_projection_matrix(&self, stack: &mut MatrixStack) {
        let mut proj = glm::perspective_rh_zo(self.aspect, self.fovy, self.znear, self.zfar);
        // Vulkan clip space has Y pointing down
        proj[(1, 1)] *= -1.0;
        stack.multiply(&proj);
    }

    pub fn apply_view_matrix(&self, stack: &mut MatrixStack) {
        stack.translate(&glm::vec3(self.pan.x, self.pan.y, -self.distance));
        stack.rotate(self.pitch, &glm::Vec3::x());
        stack.rotate(self.yaw, &glm::Vec3::y());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: &glm::Mat4, b: &glm::Mat4, eps: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    fn view_of(camera: &Camera) -> glm::Mat4 {
        let mut stack = MatrixStack::new();
        camera.apply_view_matrix(&mut stack);
        *stack.top()
    }

    fn camera() -> Camera {
        Camera::new(&CameraConfig::default())
    }

    #[test]
    fn modifiers_pick_mode() {
        assert_eq!(DragMode::from_modifiers(false, false, false), DragMode::Orbit);
        assert_eq!(DragMode::from_modifiers(true, false, false), DragMode::Pan);
        assert_eq!(DragMode::from_modifiers(false, true, false), DragMode::Zoom);
        assert_eq!(DragMode::from_modifiers(false, false, true), DragMode::Zoom);
        assert_eq!(DragMode::from_modifiers(true, true, true), DragMode::Pan);
    }

    #[test]
    fn default_view_looks_at_origin_from_distance() {
        let cam = camera();
        let eye_origin = view_of(&cam) * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((eye_origin.z + 2.0).abs() < 1e-6);
        assert!(eye_origin.x.abs() < 1e-6 && eye_origin.y.abs() < 1e-6);
    }

    #[test]
    fn zero_orbit_drag_keeps_view() {
        let mut cam = camera();
        let before = view_of(&cam);
        cam.on_press(100.0, 80.0, false, false, false);
        cam.on_drag(100.0, 80.0);
        assert!(approx_eq(&view_of(&cam), &before, 1e-7));
    }

    #[test]
    fn orbit_drag_rotates() {
        let mut cam = camera();
        cam.on_press(0.0, 0.0, false, false, false);
        cam.on_drag(50.0, -20.0);
        assert!((cam.yaw - 0.5).abs() < 1e-6);
        assert!((cam.pitch + 0.2).abs() < 1e-6);
        // Orbiting never changes how far the origin is from the eye
        let eye_origin = view_of(&cam) * glm::vec4(0.0, 0.0, 0.0, 1.0);
        assert!((eye_origin.z + 2.0).abs() < 1e-5);
    }

    #[test]
    fn pan_round_trip_restores_view() {
        let mut cam = camera();
        let before = view_of(&cam);
        cam.on_press(200.0, 150.0, true, false, false);
        cam.on_drag(260.0, 110.0);
        assert!(!approx_eq(&view_of(&cam), &before, 1e-5));
        cam.on_drag(200.0, 150.0);
        assert!(approx_eq(&view_of(&cam), &before, 1e-6));
    }

    #[test]
    fn pan_follows_screen_axes() {
        let mut cam = camera();
        cam.on_press(0.0, 0.0, true, false, false);
        cam.on_drag(100.0, 100.0);
        assert!(cam.pan.x > 0.0);
        assert!(cam.pan.y < 0.0);
    }

    #[test]
    fn zoom_drag_scales_distance() {
        let mut cam = camera();
        cam.on_press(0.0, 0.0, false, true, false);
        cam.on_drag(0.0, 100.0);
        assert!((cam.distance - 1.0).abs() < 1e-6);
        cam.on_drag(0.0, 0.0);
        assert!((cam.distance - 1.5).abs() < 1e-6);
    }

    #[test]
    fn zoom_never_crosses_the_target() {
        let mut cam = camera();
        cam.on_press(0.0, 0.0, false, false, true);
        cam.on_drag(0.0, 10_000.0);
        assert!(cam.distance >= MIN_DISTANCE);
    }

    #[test]
    fn press_resets_anchor() {
        let mut cam = camera();
        cam.on_press(0.0, 0.0, false, false, false);
        cam.on_drag(10.0, 0.0);
        cam.on_press(500.0, 500.0, false, false, false);
        cam.on_drag(500.0, 500.0);
        assert!((cam.yaw - 0.1).abs() < 1e-6);
    }

    #[test]
    fn projection_uses_aspect_and_flips_y() {
        let mut cam = camera();
        cam.set_aspect(2.0);
        let mut stack = MatrixStack::new();
        cam.apply_projection_matrix(&mut stack);
        let p = stack.top();
        let f = 1.0 / (45.0_f32.to_radians() / 2.0).tan();
        assert!((p[(0, 0)] - f / 2.0).abs() < 1e-5);
        assert!((p[(1, 1)] + f).abs() < 1e-5);
    }

    #[test]
    fn projection_maps_clip_planes_to_unit_depth() {
        let cam = camera();
        let mut stack = MatrixStack::new();
        cam.apply_projection_matrix(&mut stack);
        let near = stack.top() * glm::vec4(0.0, 0.0, -0.1, 1.0);
        let far = stack.top() * glm::vec4(0.0, 0.0, -1000.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn invalid_aspect_is_ignored() {
        let mut cam = camera();
        cam.set_aspect(1.5);
        cam.set_aspect(0.0);
        cam.set_aspect(f32::NAN);
        assert_eq!(cam.aspect, 1.5);
    }
}
