mod config;
mod engine;
mod render;

use std::path::PathBuf;

use clap::{CommandFactory, Parser};
use vulkano::sync;
use vulkano::sync::GpuFuture;

use winit::event::{Event, KeyboardInput, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};

use crate::config::Config;
use crate::engine::{Engine, InputEvent, Modifiers};

#[derive(Parser)]
#[command(name = "bouncing-sphere")]
#[command(about = "Textured sphere bouncing in front of an orbit camera")]
struct Args {
    /// Directory holding the sphere texture and an optional config.toml
    resource_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(resource_dir) = Args::parse().resource_dir else {
        println!("Please specify the resource directory.");
        Args::command().print_help()?;
        return Ok(());
    };

    let config = Config::load(&resource_dir)?;

    // Render setup
    let event_loop = EventLoop::new();
    let texture_path = resource_dir.join(&config.sphere.texture);
    let mut render = render::Render::new(&event_loop, &config.window, &texture_path)?;

    // Engine setup
    let mut engine = Engine::new(&config);
    engine.camera.set_aspect(render.aspect_ratio);
    let sphere_buffers = render.upload_mesh(&engine.mesh)?;

    // Winit reports the cursor and modifiers separately from button presses
    let mut cursor = (0.0, 0.0);
    let mut modifiers = Modifiers::default();

    let mut previous_frame_end =
        Some(Box::new(sync::now(render.device.clone())) as Box<dyn GpuFuture>);
    event_loop.run(move |event, _, control_flow| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::KeyboardInput {
                input:
                    KeyboardInput {
                        state,
                        virtual_keycode: Some(keycode),
                        ..
                    },
                ..
            } => {
                engine.handle_event(InputEvent::from_event_state(state, keycode));
                if engine.should_close() {
                    log::info!("Shutting down...");
                    *control_flow = ControlFlow::Exit;
                }
            }

            WindowEvent::ReceivedCharacter(key) => {
                engine.handle_event(InputEvent::Char(key));
            }

            WindowEvent::ModifiersChanged(state) => {
                modifiers = state.into();
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                engine.handle_event(InputEvent::from_mouse_button(state, cursor, modifiers));
            }

            WindowEvent::CursorMoved { position, .. } => {
                cursor = (position.x, position.y);
                engine.handle_event(InputEvent::from_cursor_moved(position.x, position.y));
            }

            WindowEvent::CloseRequested => {
                *control_flow = ControlFlow::Exit;
            }

            WindowEvent::Resized(size) => {
                render.recreate_swapchain();
                engine.handle_event(InputEvent::Resized {
                    width: size.width,
                    height: size.height,
                });
            }

            _ => {}
        },

        Event::RedrawEventsCleared => {
            render.window().request_redraw();
        }

        Event::RedrawRequested(_) => {
            if let Some(future) = previous_frame_end.as_mut() {
                future.cleanup_finished();
            }

            let transforms = engine.frame(engine.elapsed_seconds());

            render.start();
            render.draw(&sphere_buffers, &transforms, engine.raster_mode());
            render.finish(&mut previous_frame_end);
        }
        _ => (),
    });
}
