//! Protocol parsing: tags, event identities, and the RFC-1459 parser.
//!
//! The [`Protocol`] API identity owns the promotion of raw network lines
//! into typed events. The default implementation, [`Rfc1459Parser`],
//! subscribes to [`RawLineEvent`](crate::connection::RawLineEvent) and
//! re-types each event through [`ParsedEvent`] and, when the command is
//! recognized, one of the more specific identities below, attaching the
//! tags each identity requires.

mod parser;
mod split;

pub use parser::Rfc1459Parser;
pub use split::irc_split;

use crate::event::EventKind;
use crate::module::ModuleApi;
use crate::tag::TagContainer;

/// Module API identity for protocol parsers.
pub struct Protocol;

impl ModuleApi for Protocol {}

///////////////////////////////////////////////////////////////////////////
// Tags

/// The parameters extracted from a message according to the protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parameters {
    /// Ordered parameter list as produced by [`irc_split`].
    pub params: Vec<String>,
}

/// The origin of a message: the user (or server) who caused it.
///
/// Commands sent without a prefix carry no origin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// The verbatim sender mask, without the leading `:`.
    pub origin: String,
}

/// The recipient of a message, e.g. the channel being left.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recipient {
    /// The verbatim recipient string.
    pub recipient: String,
}

/// Classification of a text message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    /// Not a PRIVMSG or NOTICE (e.g. a quit or part reason).
    #[default]
    Other,
    /// A PRIVMSG payload.
    Privmsg,
    /// A NOTICE payload.
    Notice,
}

/// A text message attached to an event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageText {
    /// The original message text.
    pub raw: String,
    /// What kind of message this is.
    pub kind: MessageKind,
}

/// A nickname change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NickChange {
    /// The nickname before the change.
    pub old_nick: String,
    /// The nickname after the change.
    pub new_nick: String,
}

/// A numeric server reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Numeric {
    /// The reply number, `0..=999`.
    pub number: u16,
}

/// A CTCP payload.
///
/// Declared for protocol extensions; the core parser does not produce it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ctcp {
    /// The CTCP command, e.g. `ACTION` or `VERSION`.
    pub kind: String,
    /// The raw payload between the delimiters.
    pub raw: String,
}

///////////////////////////////////////////////////////////////////////////
// Events

/// Raised after a raw line has been split into parameters.
pub struct ParsedEvent;

impl EventKind for ParsedEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>()
    }
}

/// Raised for a numeric server reply.
pub struct NumericEvent;

impl EventKind for NumericEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>() && data.contains::<Origin>() && data.contains::<Numeric>()
    }
}

/// Raised when a user changes nickname.
pub struct NickEvent;

impl EventKind for NickEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>() && data.contains::<Origin>() && data.contains::<NickChange>()
    }
}

/// Raised when a user quits.
///
/// Carries a [`MessageText`] tag iff a quit message was sent.
pub struct QuitEvent;

impl EventKind for QuitEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>() && data.contains::<Origin>()
    }
}

/// Raised when a user leaves a channel.
///
/// Carries a [`MessageText`] tag iff a part message was sent.
pub struct PartEvent;

impl EventKind for PartEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>()
            && data.contains::<Origin>()
            && data.contains::<Recipient>()
    }
}

/// Raised for a PRIVMSG or NOTICE delivered to the client.
///
/// Declared for protocol extensions; the core parser leaves PRIVMSG and
/// NOTICE lines at [`ParsedEvent`].
pub struct MessageEvent;

impl EventKind for MessageEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<Parameters>()
            && data.contains::<Origin>()
            && data.contains::<Recipient>()
            && data.contains::<MessageText>()
    }
}

/// Raised when the server sends a PING.
///
/// The [`MessageText`] tag holds the token to return to the sender.
pub struct PingEvent;

impl EventKind for PingEvent {
    fn check_tags(data: &TagContainer) -> bool {
        data.contains::<MessageText>()
    }
}
