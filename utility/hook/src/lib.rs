mod hooks;
pub use hooks::*;

mod lifecycle;
pub use lifecycle::*;

mod state;
pub use state::*;

#[cfg(any(test, feature = "testing"))]
mod testing;
#[cfg(any(test, feature = "testing"))]
pub use testing::*;
