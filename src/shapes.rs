pub mod point;
pub mod rect;
mod util;
