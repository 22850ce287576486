//! # pollcast-protocol
//!
//! Wire protocol definitions for the pollcast classroom poll service.
//!
//! This crate defines the messages exchanged between classroom clients and
//! the coordination server, the records carried inside them, and the codecs
//! used to put them on the wire.
//!
//! ## Frame Types
//!
//! - [`ClientFrame`] - Commands issued by teachers and students
//! - [`ServerFrame`] - Events fanned out by the server
//! - [`Poll`] / [`Participant`] / [`ChatMessage`] - Snapshot records
//!
//! ## Example
//!
//! ```rust
//! use pollcast_protocol::{codec, ClientFrame};
//!
//! let frame = ClientFrame::SubmitAnswer {
//!     poll_id: "poll_1".to_string(),
//!     option: "Paris".to_string(),
//! };
//!
//! // JSON text frames
//! let text = codec::encode_json(&frame).unwrap();
//! let decoded: ClientFrame = codec::decode_json(&text).unwrap();
//! assert_eq!(frame, decoded);
//!
//! // Length-prefixed MessagePack binary frames
//! let bytes = codec::encode(&frame).unwrap();
//! let decoded: ClientFrame = codec::decode(&bytes).unwrap();
//! assert_eq!(frame, decoded);
//! ```

pub mod codec;
pub mod frames;
pub mod records;
pub mod version;

pub use codec::{decode, encode, Encoding, ProtocolError};
pub use frames::{ClientFrame, ServerFrame};
pub use records::{ChatMessage, Participant, Poll, Role, Tally};
pub use version::{Version, PROTOCOL_VERSION};
