//! RESP2 server side, for tests
//!
//! The client talks to the store through the `redis` crate. This module is the
//! other end of the wire: frames, a framing codec and a loopback server that
//! answers from a [`MemoryStore`](crate::store::MemoryStore).

mod frame;
pub mod server;

pub use codec::FrameCodec;
pub use frame::{Frame, FrameError};
