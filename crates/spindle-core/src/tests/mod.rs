//! Test suites for the dispatch loop.

mod support;
