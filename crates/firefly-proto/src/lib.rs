//! # firefly-proto
//!
//! Wire-level grammar used by the Firefly bot runtime to make sense of what
//! an IRC server sends before anything is routed to a plugin.
//!
//! ## Features
//!
//! - ISUPPORT (numeric 005) capability parsing with incremental merges
//! - `nick!user@host` hostmask parsing with cached host resolution
//! - Channel vs. user destination classification driven by `CHANTYPES`
//! - Formatting-code stripping for message bodies
//! - Nick mention detection (start, end, anywhere)
//! - Command-line detection and shell-style tokenization
//!
//! ## Quick Start
//!
//! ```rust
//! use firefly_proto::{CapabilityTable, Destination, Hostmask, Message, MessageKind};
//!
//! let mut caps = CapabilityTable::new();
//! caps.apply(["CHANTYPES=#&", "PREFIX=(ov)@+"]);
//!
//! let dest = Destination::classify("#rust", &caps);
//! assert!(dest.is_channel());
//!
//! let source = Hostmask::parse("Nick!~user@example.org");
//! let msg = Message::new(">>> test poke 2", dest, source, MessageKind::Message);
//! let parts = msg.command_parts(Some(">>>")).unwrap();
//! assert_eq!(parts.plugin, "test");
//! assert_eq!(parts.command, "poke");
//! assert_eq!(parts.args, vec!["2".to_string()]);
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod destination;
pub mod error;
pub mod format;
pub mod hostmask;
pub mod isupport;
pub mod mention;
pub mod message;

pub use self::destination::{Destination, DestinationKind, DEFAULT_CHANNEL_TYPES};
pub use self::error::{CommandError, ResolveError};
pub use self::format::{strip_style, FormattedStringExt};
pub use self::hostmask::{Hostmask, Resolution};
pub use self::isupport::{CapabilityTable, ChanModes};
pub use self::mention::{detect_mention, Mention, MentionLocation, MentionMatcher};
pub use self::message::{CommandParts, Message, MessageKind};
