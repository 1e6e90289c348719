pub mod app;
pub mod env;
pub mod runtime;

pub use app::run;
