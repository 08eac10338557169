pub mod gemini;
pub mod image;
pub mod session;
pub mod settings;

pub use image::*;
pub use session::*;
pub use settings::*;
