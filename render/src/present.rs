use bar::{BarRegistry, Canvas, Rect};
use config::PlacementConfig;

/// Something that can put a bar on screen.
pub trait Backend {
    type Error;

    /// Moves bar `index` to `rect` and shows the leftmost `rect.width`
    /// columns of `canvas`.
    fn publish(&mut self, index: usize, rect: Rect, canvas: &Canvas) -> Result<(), Self::Error>;
}

/// Publishes every bar holding a committed frame. Returns how many were
/// published.
pub fn present<B: Backend>(
    bars: &BarRegistry,
    placement: &PlacementConfig,
    backend: &mut B,
) -> Result<usize, B::Error> {
    let mut published = 0;
    for (index, bar) in bars.iter().enumerate() {
        let (Some((canvas, _)), Some(rect)) = (bar.frame(), bar.placement(placement)) else {
            continue;
        };
        if rect.width == 0 || rect.height == 0 {
            continue;
        }
        backend.publish(index, rect, canvas)?;
        published += 1;
    }
    Ok(published)
}
