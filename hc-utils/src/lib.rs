mod hash;
pub use hash::*;
mod json;
pub use json::*;
mod lines;
pub use lines::*;
