//! Port discovery from process launch arguments.
//!
//! Hosts are started by the test driver with `--e2e-test-port=<port>` among
//! their own arguments. Only that exact token shape is recognised; everything
//! else on the command line belongs to the host and is ignored.

use std::ffi::OsStr;

use crate::defaults::PORT_ARGUMENT;

/// Scans launch arguments for the control endpoint port.
///
/// The first argument carrying a value that parses as a 16-bit port wins.
/// Out-of-range, negative, and non-numeric values are treated as absent and
/// scanning continues. `0` is a valid value and selects an ephemeral port.
#[must_use]
pub fn port_from_args<I, S>(args: I) -> Option<u16>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    args.into_iter().find_map(|argument| {
        let text = argument.as_ref().to_str()?;
        parse_port_argument(text)
    })
}

fn parse_port_argument(argument: &str) -> Option<u16> {
    argument
        .strip_prefix(PORT_ARGUMENT)
        .and_then(|value| value.trim().parse::<u16>().ok())
}
