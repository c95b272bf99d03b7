//! Window event plumbing shared by the native binary and the browser entry point.

use anyhow::Result;
use log::{debug, info};
use winit::event::{ElementState, Event, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};

use crate::app::Viewer;
use crate::input::{KeyCode, MouseButton};
use crate::render::Renderer;

/// Pixels of precise scrolling that count as one wheel step.
const PIXELS_PER_WHEEL_STEP: f32 = 100.0;

/// A [`Viewer`] wired to a window and its renderer.
pub struct ViewerApp {
    renderer: Renderer,
    viewer: Viewer,
    pub last_error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(renderer: Renderer, viewer: Viewer) -> Self {
        Self {
            renderer,
            viewer,
            last_error: None,
        }
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    /// Routes one event. `now_seconds` is a monotonic timestamp used for
    /// redraws.
    pub fn process_event(
        &mut self,
        event: &Event<()>,
        elwt: &ActiveEventLoop,
        now_seconds: f64,
    ) -> Result<()> {
        elwt.set_control_flow(ControlFlow::Poll);
        match event {
            Event::WindowEvent { event, window_id } if *window_id == self.renderer.window_id() => {
                match event {
                    WindowEvent::CloseRequested => elwt.exit(),
                    WindowEvent::Resized(size) => {
                        self.renderer.resize(*size);
                        self.viewer.resize(size.width, size.height);
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = self.renderer.window().inner_size();
                        self.renderer.resize(size);
                        self.viewer.resize(size.width, size.height);
                    }
                    WindowEvent::KeyboardInput { event, .. } => self.handle_keyboard(event),
                    WindowEvent::CursorMoved { position, .. } => {
                        self.viewer
                            .pointer_moved(position.x as f32, position.y as f32);
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        let button = MouseButton::from_winit(*button);
                        let trigger = match state {
                            ElementState::Pressed => self.viewer.pointer_down(button),
                            ElementState::Released => self.viewer.pointer_up(button),
                        };
                        if let Some(trigger) = trigger {
                            debug!("pointer triggered {trigger:?}");
                        }
                    }
                    WindowEvent::MouseWheel { delta, .. } => {
                        let steps = match delta {
                            MouseScrollDelta::LineDelta(_, y) => *y,
                            MouseScrollDelta::PixelDelta(position) => {
                                position.y as f32 / PIXELS_PER_WHEEL_STEP
                            }
                        };
                        self.viewer.wheel(steps);
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(err) = self.viewer.tick(now_seconds, &mut self.renderer) {
                            self.renderer.recover(err)?;
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                self.renderer.window().request_redraw();
            }
            Event::LoopExiting => {
                let stats = self.viewer.stats();
                info!(
                    "rendered {} frame(s), {:.1} fps",
                    stats.frame_count, stats.smoothed_fps
                );
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_keyboard(&mut self, event: &KeyEvent) {
        if event.repeat {
            return;
        }
        let Some(key) = KeyCode::from_winit(&event.logical_key) else {
            return;
        };
        let trigger = match event.state {
            ElementState::Pressed => self.viewer.key_down(key),
            ElementState::Released => self.viewer.key_up(key),
        };
        if let Some(trigger) = trigger {
            debug!("keyboard triggered {trigger:?}");
        }
    }
}
