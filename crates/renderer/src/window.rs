use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use crate::compositor::{Compositor, InputEvent};
use crate::gpu::{GpuBackend, GpuContext};
use crate::runtime::{time_source_for_policy, BoxedTimeSource, FrameScheduler};
use crate::types::{RendererConfig, ViewportSize};

/// What a key press asks the window loop to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum KeyAction {
    Close,
    NudgeLen(f32),
    Press,
    Release,
    Ignore,
}

/// Maps a winit key event onto the compositor's inputs. Auto-repeat is
/// ignored so holding a key produces exactly one down and one up edge.
pub(crate) fn classify_key(event: &KeyEvent, len_step: f32) -> KeyAction {
    if event.repeat {
        return KeyAction::Ignore;
    }
    key_action(&event.logical_key, event.state, len_step)
}

fn key_action(key: &Key, state: ElementState, len_step: f32) -> KeyAction {
    match (key, state) {
        (Key::Named(NamedKey::Escape), ElementState::Pressed) => KeyAction::Close,
        (Key::Named(NamedKey::ArrowUp), ElementState::Pressed) => KeyAction::NudgeLen(len_step),
        (Key::Named(NamedKey::ArrowDown), ElementState::Pressed) => {
            KeyAction::NudgeLen(-len_step)
        }
        (Key::Named(NamedKey::Escape | NamedKey::ArrowUp | NamedKey::ArrowDown), _) => {
            KeyAction::Ignore
        }
        (_, ElementState::Pressed) => KeyAction::Press,
        (_, ElementState::Released) => KeyAction::Release,
    }
}

/// GPU resources and compositor for the interactive window.
struct WindowState {
    window: Arc<Window>,
    context: GpuContext,
    compositor: Compositor<GpuBackend>,
    time_source: BoxedTimeSource,
    scheduler: FrameScheduler,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let context = GpuContext::new(window.as_ref(), size)?;
        let backend = GpuBackend::new(&context.device, &context.queue, context.surface_format);
        let text = crate::build_text_layer(config)?;
        let mut compositor = Compositor::new(backend, config.scene.clone(), text)
            .with_animation(config.amplitude, config.len);
        compositor.mount(ViewportSize::new(size.width, size.height));
        Ok(Self {
            window,
            context,
            compositor,
            time_source: time_source_for_policy(&config.policy),
            scheduler: FrameScheduler::new(&config.policy),
        })
    }

    fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.context.resize(new_size);
        self.compositor.handle(InputEvent::Resize {
            width: new_size.width,
            height: new_size.height,
        });
    }

    fn nudge_len(&mut self, delta: f32) {
        let len = self.compositor.animation().len() + delta;
        self.compositor.handle(InputEvent::Slider(len));
        debug!(len = self.compositor.animation().len(), "slider moved");
    }

    fn render_frame(&mut self) -> Result<(), wgpu::SurfaceError> {
        let sample = self.time_source.sample();
        let frame = match self.compositor.tick(sample.seconds) {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(()),
            Err(err) => {
                error!(error = %err, "failed to render frame");
                return Ok(());
            }
        };
        let output = self.context.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        self.compositor.backend().present(&frame.texture, &view);
        self.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

/// Opens the window and runs the animation loop until it is closed.
pub(crate) fn run(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.scene.text.title.as_str())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config)?;
    let len_step = config.scene.len_step;
    info!(size = %state.compositor.viewport(), "title card window open");
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        state.compositor.unmount();
                        elwt.exit();
                    }
                    WindowEvent::Resized(new_size) => state.resize(new_size),
                    WindowEvent::KeyboardInput { event, .. } => {
                        match classify_key(&event, len_step) {
                            KeyAction::Close => {
                                state.compositor.unmount();
                                elwt.exit();
                            }
                            KeyAction::NudgeLen(delta) => state.nudge_len(delta),
                            KeyAction::Press => {
                                state.compositor.handle(InputEvent::KeyDown);
                            }
                            KeyAction::Release => {
                                state.compositor.handle(InputEvent::KeyUp);
                            }
                            KeyAction::Ignore => {}
                        }
                    }
                    WindowEvent::RedrawRequested => match state.render_frame() {
                        Ok(()) => state.scheduler.mark_rendered(Instant::now()),
                        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                            state.context.reconfigure();
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => {
                            error!("surface out of memory; closing window");
                            state.compositor.unmount();
                            elwt.exit();
                        }
                        Err(other) => {
                            warn!(error = ?other, "surface error; retrying next frame");
                        }
                    },
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now = Instant::now();
                if state.scheduler.ready_for_frame(now) {
                    state.window().request_redraw();
                    elwt.set_control_flow(ControlFlow::Wait);
                } else if let Some(deadline) = state.scheduler.next_deadline() {
                    elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
                } else {
                    elwt.set_control_flow(ControlFlow::Wait);
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
