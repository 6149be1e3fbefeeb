// Consolidated integration test suite, compiled by `tests/tests.rs`.
mod diagnostics;
mod discovery;
