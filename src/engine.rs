pub mod animation;
pub mod camera;
pub mod input;
pub mod matrix_stack;
pub mod mesh;

use std::time::Instant;

use nalgebra_glm as glm;

pub use animation::Bounce;
pub use camera::Camera;
pub use input::{Action, InputEvent, InputManager, Modifiers};
pub use matrix_stack::MatrixStack;
pub use mesh::{SphereMesh, generate_sphere};

use crate::config::Config;

pub const CULL_TOGGLE: char = 'c';
pub const WIREFRAME_TOGGLE: char = 'z';

/// Matrices uploaded to the shaders for one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameTransforms {
    pub projection: glm::Mat4,
    pub model_view: glm::Mat4,
    /// Inverse transpose of `model_view`, for normals
    pub normal: glm::Mat4,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterMode {
    pub cull_back_faces: bool,
    pub wireframe: bool,
}

/// Everything the render loop and the input handlers share.
pub struct Engine {
    pub camera: Camera,
    pub input: InputManager,
    pub mesh: SphereMesh,
    start: Instant,
}

impl Engine {
    pub fn new(config: &Config) -> Self {
        let resolution = config.sphere.resolution;
        let mesh = generate_sphere(resolution, resolution);
        log::info!(
            "Generated sphere: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );

        Engine {
            camera: Camera::new(&config.camera),
            input: InputManager::new(),
            mesh,
            start: Instant::now(),
        }
    }

    pub fn handle_event(&mut self, event: InputEvent) {
        self.input.on_event(&event);

        match event {
            InputEvent::MousePressed { x, y, modifiers } => {
                self.camera
                    .on_press(x, y, modifiers.shift, modifiers.ctrl, modifiers.alt);
            }
            InputEvent::MouseDragged { x, y } => {
                if self.input.is_button_held() {
                    self.camera.on_drag(x, y);
                }
            }
            InputEvent::Resized { width, height } => {
                if width > 0 && height > 0 {
                    self.camera.set_aspect(width as f32 / height as f32);
                }
            }
            _ => {}
        }
    }

    pub fn should_close(&self) -> bool {
        self.input.is_action_active(&Action::ShutDown)
    }

    pub fn raster_mode(&self) -> RasterMode {
        RasterMode {
            cull_back_faces: self.input.toggles.is_on(CULL_TOGGLE),
            wireframe: self.input.toggles.is_on(WIREFRAME_TOGGLE),
        }
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Builds the projection and model-view for time `t`, leaving both
    /// stacks as deep as they started.
    pub fn frame(&self, t: f64) -> FrameTransforms {
        let mut projection = MatrixStack::new();
        let mut model_view = MatrixStack::new();

        projection.push();
        self.camera.apply_projection_matrix(&mut projection);
        model_view.push();
        self.camera.apply_view_matrix(&mut model_view);
        Bounce::at(t).apply(&mut model_view);

        let transforms = FrameTransforms {
            projection: *projection.top(),
            model_view: *model_view.top(),
            normal: glm::inverse_transpose(*model_view.top()),
        };

        model_view.pop();
        projection.pop();
        debug_assert_eq!(model_view.depth(), 1);
        debug_assert_eq!(projection.depth(), 1);

        transforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn approx_eq(a: &glm::Mat4, b: &glm::Mat4, eps: f32) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < eps)
    }

    fn small_engine() -> Engine {
        let mut config = Config::default();
        config.sphere.resolution = 4;
        Engine::new(&config)
    }

    #[test]
    fn resolution_four_builds_reference_mesh() {
        let engine = small_engine();
        assert_eq!(engine.mesh.vertex_count(), 16);
        assert_eq!(engine.mesh.indices.len(), 54);
    }

    #[test]
    fn drag_without_button_is_ignored() {
        let mut engine = small_engine();
        engine.handle_event(InputEvent::MouseDragged { x: 40.0, y: 0.0 });
        assert_eq!(engine.camera.yaw, 0.0);
    }

    #[test]
    fn press_drag_release_orbits() {
        let mut engine = small_engine();
        engine.handle_event(InputEvent::MousePressed {
            x: 0.0,
            y: 0.0,
            modifiers: Modifiers::default(),
        });
        engine.handle_event(InputEvent::MouseDragged { x: 40.0, y: 0.0 });
        engine.handle_event(InputEvent::MouseReleased);
        engine.handle_event(InputEvent::MouseDragged { x: 90.0, y: 0.0 });
        assert!((engine.camera.yaw - 0.4).abs() < 1e-6);
    }

    #[test]
    fn shift_press_pans() {
        let mut engine = small_engine();
        engine.handle_event(InputEvent::MousePressed {
            x: 0.0,
            y: 0.0,
            modifiers: Modifiers {
                shift: true,
                ..Modifiers::default()
            },
        });
        engine.handle_event(InputEvent::MouseDragged { x: 100.0, y: 0.0 });
        assert_eq!(engine.camera.yaw, 0.0);
        assert!(engine.camera.pan.x > 0.0);
    }

    #[test]
    fn resize_updates_aspect() {
        let mut engine = small_engine();
        engine.handle_event(InputEvent::Resized {
            width: 800,
            height: 400,
        });
        assert_eq!(engine.camera.aspect, 2.0);
        engine.handle_event(InputEvent::Resized {
            width: 0,
            height: 400,
        });
        assert_eq!(engine.camera.aspect, 2.0);
    }

    #[test]
    fn char_events_drive_raster_mode() {
        let mut engine = small_engine();
        assert_eq!(engine.raster_mode(), RasterMode::default());
        engine.handle_event(InputEvent::Char('c'));
        engine.handle_event(InputEvent::Char('z'));
        engine.handle_event(InputEvent::Char('z'));
        assert_eq!(
            engine.raster_mode(),
            RasterMode {
                cull_back_faces: true,
                wireframe: false,
            }
        );
    }

    #[test]
    fn escape_requests_close() {
        let mut engine = small_engine();
        assert!(!engine.should_close());
        engine.handle_event(InputEvent::KeyPressed(winit::event::VirtualKeyCode::Escape));
        assert!(engine.should_close());
    }

    #[test]
    fn frame_composes_view_then_bounce() {
        let engine = small_engine();
        let t = 0.4;
        let frame = engine.frame(t);

        let bounce = Bounce::at(t);
        let expected = glm::translation(&glm::vec3(0.0, 0.0, -2.0))
            * glm::translation(&glm::vec3(0.0, bounce.translate_y, 0.0))
            * glm::scaling(&glm::vec3(bounce.scale_xz, 1.0, bounce.scale_xz));
        assert!(approx_eq(&frame.model_view, &expected, 1e-5));

        let identity = frame.model_view.transpose() * frame.normal;
        assert!(approx_eq(&identity, &glm::Mat4::identity(), 1e-4));
    }

    #[test]
    fn frame_is_pure_in_time() {
        let engine = small_engine();
        assert_eq!(engine.frame(3.0), engine.frame(3.0));
        assert_eq!(
            engine.frame(1.0).projection,
            engine.frame(2.0).projection
        );
    }
}
