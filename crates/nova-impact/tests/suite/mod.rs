// Consolidated integration test suite, compiled by `tests/tests.rs`.
mod background;
mod config;
mod lifecycle;
mod properties;
mod scenarios;
mod support;
