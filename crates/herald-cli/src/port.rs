//! Free-port discovery for the local dev server.

use std::io::ErrorKind;
use std::net::TcpListener;

use anyhow::{Context, Result, bail};

/// Hard ceiling on probed ports so an exhausted range fails instead of
/// scanning the whole port space.
const MAX_PROBES: u32 = 1000;

/// Find the first free port at or above `start_port`.
///
/// Each candidate is probed by binding a listener, which is released
/// before returning so the caller's own server can bind the port.
/// A bind error other than "address in use" is fatal.
pub fn find_available_port(start_port: u16) -> Result<u16> {
    find_within(start_port, MAX_PROBES)
}

fn find_within(start_port: u16, max_probes: u32) -> Result<u16> {
    let mut port = start_port;
    for _ in 0..max_probes {
        match TcpListener::bind(("127.0.0.1", port)) {
            Ok(listener) => {
                // Unbind before handing the port to the caller.
                drop(listener);
                return Ok(port);
            }
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::debug!(port, "port in use, probing next");
                port = match port.checked_add(1) {
                    Some(next) => next,
                    None => bail!("no free port between {start_port} and {port}"),
                };
            }
            Err(e) => {
                return Err(e).with_context(|| format!("probing port {port}"));
            }
        }
    }
    bail!("no free port found within {max_probes} ports of {start_port}")
}
