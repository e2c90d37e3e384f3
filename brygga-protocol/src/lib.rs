//! ## brygga-protocol
//! Wire model for the external-mode scope protocol: JSON messages with
//! PascalCase keys and an integer `Command` discriminant. Requests decode in
//! two steps (envelope first, then the command-specific body) so that an
//! unknown code can still be answered with an error reply instead of being
//! dropped on the floor.

pub mod message;

pub use message::{
    encode, ErrorReply, ModelInfoReply, ProtocolError, Request, ScopeReply, ScopeRequest,
    TuneParamsRequest,
};
