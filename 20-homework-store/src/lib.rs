//! Storage tier of a two-tier homework tracker.
//!
//! The front-facing tier never touches the data directly. It opens a TCP
//! connection per user action, sends one JSON request and reads one JSON
//! response. Modules:
//!
//! - [`record`] defines homework records and the tombstoning slots holding them.
//! - [`store`] is the concurrent record store with its two-level locking.
//! - [`dispatcher`] maps operation names onto store calls and builds responses.
//! - [`protocol`] holds the wire types and the newline-delimited JSON framing.
//! - [`server`] accepts connections and spawns a task per request.
//! - [`client`] is the caller side used by the front-facing tier.
//! - [`probe`] pings a backend periodically and logs outages.
//! - [`cli`] parses the command line for the binary.

pub mod cli;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod probe;
pub mod protocol;
pub mod record;
pub mod server;
pub mod store;
