//! Connection-level test suites.

mod support;
