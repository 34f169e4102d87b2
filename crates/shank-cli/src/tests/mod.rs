//! In-crate tests for the `shank` runtime.
//!
//! Unit suites drive the session driver and the command synthesizer against
//! scripted connections; the behaviour suite runs whole invocations against a
//! fake warden server on a loopback socket.

mod session;
mod support;
