//! Property-based tests

mod queue_proptest;
