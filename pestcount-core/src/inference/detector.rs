pub mod model;
pub mod session;

pub use model::PestDetector;
pub use session::OrtInvoker;
