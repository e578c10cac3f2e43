//! Turns protocol messages into bevelled bar images and puts them on screen.

mod bevel;
mod compositor;
pub mod farbfeld;
mod font;
mod gpu;
mod present;
mod style;

pub use bevel::Bevel;
pub use compositor::{Compositor, Frame, Layout};
pub use font::{FontMetrics, FontRasterizer, Typeface};
pub use gpu::{PresentError, Presenter};
pub use present::{present, Backend};
pub use style::{Style, StyleTable};
