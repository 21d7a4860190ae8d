//! Primary network address of the host.
//!
//! Uses `hostname -I`, which lists every configured address with the primary
//! IPv4 address first.

use tracing::debug;

use super::run_command;

/// Returns the primary address, or an empty string when none can be found.
pub fn sample_network_address() -> String {
    match run_command("hostname", &["-I"]) {
        Ok(out) => first_address(&out),
        Err(e) => {
            debug!("hostname -I failed: {}", e);
            String::new()
        }
    }
}

/// Picks the first IPv4 address from `hostname -I` output, falling back to
/// the first token when only IPv6 addresses are configured.
pub fn first_address(output: &str) -> String {
    let mut tokens = output.split_whitespace();
    let first = tokens.clone().next();

    tokens
        .find(|t| t.parse::<std::net::Ipv4Addr>().is_ok())
        .or(first)
        .unwrap_or_default()
        .to_string()
}
