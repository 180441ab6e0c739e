//! Adapters between the platform's canonical lead variables and the wire
//! encodings spoken by inbound posters and outbound buyers.
//!
//! Everything here is a pure, synchronous transformation over in-memory
//! values: the embedding service owns sockets, routing and logging sinks,
//! and calls into this crate once per request. Inbound, a poster's GET or
//! POST (form, JSON or XML) becomes a canonical field map or a structured
//! error ready to be written back as-is. Outbound, lead variables become a
//! GET/POST delivery request, and the buyer's reply is interpreted as a
//! success/failure/error outcome event that never fails to materialize.

pub mod api;
pub mod fields;
pub mod inbound;
pub mod meta;
pub mod mime;
pub mod outbound;
pub mod response;
pub mod uri;
pub mod xml;

pub use api::{InboundError, Request, Response};
pub use fields::FieldMap;
pub use mime::MimeType;
pub use outbound::{OutboundError, OutboundRequest, OutboundVars};
