mod app;
mod logging;
mod observer;
mod prompt;
mod session;

pub use app::run;
