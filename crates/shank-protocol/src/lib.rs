//! Message catalogue for the warden container-management protocol.
//!
//! The crate describes every request and response kind the `shank` client
//! exchanges with a warden server, the streaming frames used by `run`,
//! `attach`, `streamIn` and `streamOut`, and the JSON line envelope that
//! carries them. Each request kind also carries compile-time schema metadata
//! (see [`RequestKind`]) so callers can enumerate its fields and populate
//! them by name without per-kind code.

#[macro_use]
mod macros;

mod frame;
mod messages;
mod schema;

pub use frame::{Frame, FrameError};
pub use messages::{
    AttachRequest, BindMount, BindMountMode, BindMountOrigin, CapacityRequest, CapacityResponse,
    CreateRequest, CreateResponse, DestroyRequest, DestroyResponse, EchoRequest, EchoResponse,
    EnvironmentVariable, ErrorResponse, InfoRequest, InfoResponse, LimitBandwidthRequest,
    LimitBandwidthResponse, LimitCpuRequest, LimitCpuResponse, LimitDiskRequest,
    LimitDiskResponse, LimitMemoryRequest, LimitMemoryResponse, ListRequest, ListResponse,
    Message, MessageType, NetInRequest, NetInResponse, NetOutRequest, NetOutResponse,
    PayloadSource, PingRequest, PingResponse, ProcessPayload, Property, ResourceLimits,
    RunRequest, RunResponse, StopRequest, StopResponse, StreamChunk, StreamInRequest,
    StreamInResponse, StreamOutRequest, StreamOutResponse,
};
pub use schema::{
    FieldCodec, FieldError, FieldErrorKind, FieldInfo, FieldShape, FieldType, FieldValue,
    REQUEST_SUFFIX, RequestKind, has_request_suffix,
};
