//! Protobuf types and gRPC service traits for the userd service.
//!
//! Kept as a separate crate so clients needing only the wire types do not
//! pull in the server, store, or bus internals.

/// Generated protobuf types and service traits.
pub mod proto {
    #![allow(clippy::all)]
    #![allow(missing_docs)]

    include!(concat!(env!("OUT_DIR"), "/users.v1.rs"));
}

pub use proto::users_client::UsersClient;
pub use proto::users_server::{Users, UsersServer};
