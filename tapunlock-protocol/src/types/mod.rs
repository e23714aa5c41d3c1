pub mod pattern;
pub mod side;
pub mod tap;

pub use pattern::*;
pub use side::*;
pub use tap::*;
