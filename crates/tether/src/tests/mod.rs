//! Test suites for the control centre.

mod centre_unit;
mod support;
