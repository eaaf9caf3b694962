//! Test suites for the worker bootstrap.

mod support;
mod unit;
