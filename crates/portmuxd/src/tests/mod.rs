//! Test suites for the router daemon.

pub(crate) mod support;
