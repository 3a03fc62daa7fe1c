mod feedback;
mod license;

pub use feedback::*;
pub use license::*;
