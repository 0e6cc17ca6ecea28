mod display;
mod state;
mod surface;

pub use display::{Display, Rasterizer};
pub use state::{Document, SurfaceState};
pub use surface::{APP_TITLE, LinkTarget, Surface, SurfaceEvent, classify_link};
