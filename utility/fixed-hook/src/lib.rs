//! Hooks returning handles whose identity is fixed for the lifetime of the
//! component instance while they always reach the latest tracked value.
//!
//! Every handle has two readers: the commit phase one (`get`, `call`) sees the
//! value of the last committed render, the render phase one (`get_at_render`,
//! `call_at_render`) sees the value of the latest render, even one in progress.

mod getter;
pub use getter::*;

mod callback;
pub use callback::*;

use hook::*;

#[cfg(test)]
mod test;
