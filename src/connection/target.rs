//! Connection target parsing.

use std::str::FromStr;

use crate::error::ClientError;

/// Default IRC port.
pub const DEFAULT_PORT: u16 = 6667;

/// A parsed connection target.
///
/// Accepted syntax is `[irc://|ircs://]host[:port]`. The port defaults to
/// 6667; an `ircs://` scheme requests TLS. The port is the trailing
/// all-digit run after the final `:`; a `:` not followed by digits only is
/// part of the host.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServerTarget {
    /// Hostname or address to connect to.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Whether TLS was requested (`ircs://`).
    pub tls: bool,
}

impl FromStr for ServerTarget {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, tls) = if let Some(rest) = s.strip_prefix("ircs://") {
            (rest, true)
        } else if let Some(rest) = s.strip_prefix("irc://") {
            (rest, false)
        } else {
            (s, false)
        };

        let mut host = rest.to_string();
        let mut port = DEFAULT_PORT;

        let last_non_digit = host.rfind(|c: char| !c.is_ascii_digit());
        if let Some(pos) = last_non_digit {
            if pos != host.len() - 1 && host.as_bytes()[pos] == b':' {
                port = host[pos + 1..]
                    .parse()
                    .map_err(|_| ClientError::InvalidTarget {
                        target: s.to_string(),
                    })?;
                host.truncate(pos);
            }
        }

        if host.is_empty() {
            return Err(ClientError::InvalidTarget {
                target: s.to_string(),
            });
        }

        Ok(Self { host, port, tls })
    }
}

impl std::fmt::Display for ServerTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = if self.tls { "ircs" } else { "irc" };
        write!(f, "{}://{}:{}", scheme, self.host, self.port)
    }
}
