//! Unit tests for the sync bounded context.

mod outbox_tests;
mod support;
