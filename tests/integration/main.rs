//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a node core against
//! mock adapters. All tests run on the host (x86_64) with no real
//! hardware or broker required.

mod mock_hw;
mod relay_node_tests;
mod runtime_tests;
mod sensor_node_tests;
