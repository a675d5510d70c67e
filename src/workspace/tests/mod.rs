//! Unit tests for the workspace bounded context.

mod support;
mod task_tests;
