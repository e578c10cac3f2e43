use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bar::{BarRegistry, Canvas, Rect};
use config::{BarConfig, ConfigError, PlacementConfig};
use feed::{FeedEvent, Message};
use render::{Backend, Compositor, FontRasterizer, Frame, PresentError, Presenter};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
#[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
use winit::platform::x11::WindowBuilderExtX11;
use winit::window::{Window, WindowBuilder, WindowId, WindowLevel};

struct AppState {
    placement: PlacementConfig,
    bars: BarRegistry,
    compositor: Compositor<FontRasterizer>,
    windows: BarWindows,
    message: Option<Message>,
    refresh: Refresh,
}

/// Whether an exposed window still waits for a repaint.
#[derive(Debug, Default)]
struct Refresh {
    pending: bool,
}

impl Refresh {
    fn request(&mut self) {
        self.pending = true;
    }

    /// A new message was drawn. Only a published frame repaints the windows.
    fn message_drawn(&mut self, published: bool) {
        if published {
            self.pending = false;
        }
    }

    fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }
}

/// One window per bar, in registry order.
struct BarWindows {
    windows: Vec<Arc<Window>>,
    presenter: Presenter,
}

impl Backend for BarWindows {
    type Error = PresentError;

    fn publish(&mut self, index: usize, rect: Rect, canvas: &Canvas) -> Result<(), PresentError> {
        let window = self
            .windows
            .get(index)
            .ok_or(PresentError::UnknownBar(index))?;
        window.set_outer_position(PhysicalPosition::new(rect.x, rect.y));
        // The surface is sized explicitly; a deferred window resize is fine.
        let _ = window.request_inner_size(PhysicalSize::new(rect.width, rect.height));
        self.presenter.publish(index, canvas, rect.width, rect.height)
    }
}

impl BarWindows {
    fn owns(&self, id: WindowId) -> bool {
        self.windows.iter().any(|window| window.id() == id)
    }
}

impl AppState {
    fn new(config: &BarConfig, bars: BarRegistry, font: FontRasterizer, windows: BarWindows) -> Self {
        Self {
            placement: config.placement,
            bars,
            compositor: Compositor::new(config, font),
            windows,
            message: None,
            refresh: Refresh::default(),
        }
    }

    /// A new message replaces the stored one and is drawn right away.
    fn handle_message(&mut self, message: Message) {
        self.message = Some(message);
        let published = matches!(self.run_pass(), Some(Frame::Ready { .. }));
        if published {
            self.publish();
        }
        self.refresh.message_drawn(published);
    }

    /// Replays the stored message. Whatever the outcome, the last good frame
    /// is shown again.
    fn flush_refresh(&mut self) {
        if !self.refresh.take() {
            return;
        }
        self.run_pass();
        self.publish();
    }

    fn run_pass(&mut self) -> Option<Frame> {
        let message = self.message.as_ref()?;
        match self.compositor.run_pass(&mut self.bars, message.as_bytes()) {
            Ok(frame) => Some(frame),
            Err(err) => {
                warn!("dropping message: {err}");
                None
            }
        }
    }

    fn publish(&mut self) {
        match render::present(&self.bars, &self.placement, &mut self.windows) {
            Ok(count) => debug!("published {count} bars"),
            Err(err) => error!("presentation failed: {err}"),
        }
    }
}

fn create_window(event_loop: &EventLoop<FeedEvent>, index: usize) -> Result<Arc<Window>> {
    let builder = WindowBuilder::new()
        .with_title("bevelbar")
        .with_decorations(false)
        .with_resizable(false)
        .with_window_level(WindowLevel::AlwaysOnTop)
        .with_position(PhysicalPosition::new(-10, -10))
        .with_inner_size(PhysicalSize::new(5u32, 5u32));
    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
    let builder = builder.with_override_redirect(true);
    let window = builder
        .build(event_loop)
        .with_context(|| format!("create window for bar {index}"))?;
    Ok(Arc::new(window))
}

fn load_config() -> Result<BarConfig> {
    match BarConfig::from_args(std::env::args_os()) {
        Ok(config) => Ok(config),
        Err(ConfigError::Args(err)) => err.exit(),
        Err(err) => Err(err).context("invalid configuration"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = load_config()?;
    let font = FontRasterizer::from_selector(&config.font, config.font_height_extra)
        .context("load font")?;
    info!("font {} at {}px", config.font.family, config.font.pixel_size);

    let event_loop = EventLoopBuilder::<FeedEvent>::with_user_event()
        .build()
        .context("create event loop")?;
    let regions = event_loop.available_monitors().map(|monitor| {
        let position = monitor.position();
        let size = monitor.size();
        Rect::new(position.x, position.y, size.width, size.height)
    });
    let bars = BarRegistry::new(regions).context("detect monitors")?;
    for (index, bar) in bars.iter().enumerate() {
        let region = bar.region();
        info!(
            "bar {index}: {}x{} at {},{}",
            region.width, region.height, region.x, region.y
        );
    }

    let windows = (0..bars.len())
        .map(|index| create_window(&event_loop, index))
        .collect::<Result<Vec<_>>>()?;
    let presenter = pollster::block_on(Presenter::new(windows.clone()))
        .context("initialize presenter")?;
    info!("using adapter {}", presenter.adapter_info().name);

    let mut state = AppState::new(&config, bars, font, BarWindows { windows, presenter });

    let proxy = event_loop.create_proxy();
    let _reader = feed::spawn_reader(std::io::stdin(), move |event| proxy.send_event(event).is_ok());

    let mut failure = None;
    event_loop.run(|event, target| {
        target.set_control_flow(ControlFlow::Wait);
        match event {
            Event::UserEvent(FeedEvent::Message(message)) => state.handle_message(message),
            Event::UserEvent(FeedEvent::Failed(err)) => {
                error!("input failed: {err}");
                failure = Some(err);
                target.exit();
            }
            Event::WindowEvent { event, window_id } if state.windows.owns(window_id) => match event {
                WindowEvent::RedrawRequested => state.refresh.request(),
                WindowEvent::CloseRequested => target.exit(),
                _ => {}
            },
            Event::AboutToWait => state.flush_refresh(),
            _ => {}
        }
    })?;

    match failure {
        Some(err) => Err(anyhow!(err).context("reading standard input")),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::Refresh;

    #[test]
    fn published_message_satisfies_pending_refresh() {
        let mut refresh = Refresh::default();
        refresh.request();
        refresh.message_drawn(true);
        assert!(!refresh.take());
    }

    #[test]
    fn dropped_message_keeps_pending_refresh() {
        let mut refresh = Refresh::default();
        refresh.request();
        refresh.message_drawn(false);
        assert!(refresh.take());
        assert!(!refresh.take());
    }

    #[test]
    fn no_refresh_without_request() {
        let mut refresh = Refresh::default();
        refresh.message_drawn(false);
        assert!(!refresh.take());
    }
}
