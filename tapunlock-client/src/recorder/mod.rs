//! Recording flow: the session state machine and the driver that runs it

mod driver;
mod state;

pub use driver::Recorder;
