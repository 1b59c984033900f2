//! Application layer: the copy pipeline and the page session driving it.

pub mod bridge;
pub mod copy;
pub mod inject;
pub mod locate;
pub mod normalize;
pub mod resolve;
pub mod session;
pub mod watch;
