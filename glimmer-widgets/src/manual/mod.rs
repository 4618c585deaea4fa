// Hand-written conversions between boxed values and glam vectors, so callers
// can do geometry with glam instead of poking at raw native structs.

pub mod rectangle;
pub mod text_iter;

pub use rectangle::RectangleExt;
pub use text_iter::TextIterExt;
