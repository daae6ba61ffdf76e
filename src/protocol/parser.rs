//! The default RFC-1459 protocol parser module.

use tracing::trace;

use crate::connection::{RawLine, RawLineEvent};
use crate::context::Irc;
use crate::error::{BoxError, Result};
use crate::event::EventRef;
use crate::handler::{HandlerHandle, Phase};
use crate::module::Module;

use super::split::irc_split;
use super::{
    MessageText, NickChange, NickEvent, Numeric, NumericEvent, Origin, Parameters, ParsedEvent,
    PartEvent, PingEvent, Protocol, QuitEvent, Recipient,
};

/// Protocol parser for the RFC-1459 client-to-server dialect.
///
/// Occupies the [`Protocol`] API identity. While loaded, every
/// [`RawLineEvent`] is split into parameters and promoted through
/// [`ParsedEvent`] into the most specific identity the command allows.
pub struct Rfc1459Parser {
    _raw_line: HandlerHandle,
}

impl Module for Rfc1459Parser {
    type Api = Protocol;
}

impl Rfc1459Parser {
    /// Creates the parser bound to `irc` and subscribes it to raw lines.
    pub fn new(irc: &Irc) -> Result<Self> {
        let raw_line = irc.attach::<RawLineEvent>(Phase::Handler, |_, ev| Self::parse(ev));
        Ok(Self {
            _raw_line: raw_line,
        })
    }

    fn parse(ev: &EventRef) -> std::result::Result<(), BoxError> {
        let line = ev.with_tag::<RawLine, _>(|tag| tag.line.clone())?;

        ev.queue_as::<ParsedEvent>(false);

        let params = irc_split(&line);
        trace!(count = params.len(), "line split");
        ev.set_tag(Parameters {
            params: params.clone(),
        });

        if params.is_empty() {
            return Ok(());
        }

        if let Some(prefix) = params[0].strip_prefix(':') {
            // Only the last parameter can be empty (a literal extended
            // ":"); the first parameter always has at least the colon.
            ev.set_tag(Origin {
                origin: prefix.to_string(),
            });

            if params.len() < 2 {
                return Ok(());
            }

            if let Some(number) = parse_numeric(&params[1]) {
                ev.set_tag(Numeric { number });
                ev.queue_as::<NumericEvent>(false);
            } else if params[1] == "QUIT" {
                if params.len() > 2 {
                    ev.set_tag(MessageText {
                        raw: params[2].clone(),
                        ..Default::default()
                    });
                }
                ev.queue_as::<QuitEvent>(false);
            } else if params.len() < 3 {
                return Ok(());
            } else if params[1] == "NICK" {
                let old_nick = prefix.split('!').next().unwrap_or(prefix).to_string();
                ev.set_tag(NickChange {
                    old_nick,
                    new_nick: params[2].clone(),
                });
                ev.queue_as::<NickEvent>(false);
            } else if params[1] == "PART" {
                ev.set_tag(Recipient {
                    recipient: params[2].clone(),
                });
                if params.len() > 3 {
                    ev.set_tag(MessageText {
                        raw: params[3].clone(),
                        ..Default::default()
                    });
                }
                ev.queue_as::<PartEvent>(false);
            }
        } else {
            if params.len() < 2 {
                return Ok(());
            }

            if params[0] == "PING" {
                ev.set_tag(MessageText {
                    raw: params[1].clone(),
                    ..Default::default()
                });
                ev.queue_as::<PingEvent>(false);
            }
        }

        Ok(())
    }
}

/// Parses a command token that consists of exactly three ASCII digits.
fn parse_numeric(token: &str) -> Option<u16> {
    let bytes = token.as_bytes();
    if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(
        (bytes[0] - b'0') as u16 * 100 + (bytes[1] - b'0') as u16 * 10 + (bytes[2] - b'0') as u16,
    )
}
