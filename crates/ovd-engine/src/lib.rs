mod capture;
mod controller;
mod error;
mod graph;
mod playback;
mod registry;
mod ring;
mod shared;

pub use controller::Engine;
pub use error::GraphError;
pub use registry::SinkRecord;
