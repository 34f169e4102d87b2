//! Request, response and streaming messages of the warden protocol.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Tag identifying a message kind on the wire.
///
/// A request and the response answering it share one tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum MessageType {
    /// Server-side failure report.
    Error,
    /// Container creation.
    Create,
    /// Container destruction.
    Destroy,
    /// Echo round trip.
    Echo,
    /// Container information.
    Info,
    /// Network bandwidth limits.
    LimitBandwidth,
    /// CPU share limits.
    LimitCpu,
    /// Disk quota limits.
    LimitDisk,
    /// Memory limits.
    LimitMemory,
    /// Container listing.
    List,
    /// Inbound port mapping.
    NetIn,
    /// Outbound network whitelisting.
    NetOut,
    /// Liveness check.
    Ping,
    /// Process spawn.
    Run,
    /// Attachment to a running process.
    Attach,
    /// Container stop.
    Stop,
    /// Server capacity.
    Capacity,
    /// Upload into a container.
    StreamIn,
    /// Download from a container.
    StreamOut,
    /// Output fragment or exit status of a process.
    ProcessPayload,
    /// Binary chunk of a file transfer.
    StreamChunk,
}

/// A message that can travel inside a [`Frame`](crate::Frame).
pub trait Message: Serialize + DeserializeOwned + Debug {
    /// Wire tag of the message.
    const TYPE: MessageType;
}

macro_rules! message_types {
    ($($name:ty => $variant:ident),* $(,)?) => {
        $(
            impl Message for $name {
                const TYPE: MessageType = MessageType::$variant;
            }
        )*
    };
}

/// Direction of a bind mount.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMountMode {
    /// Read-only mount.
    #[default]
    Ro,
    /// Read-write mount.
    Rw,
}

/// Side the bind mount source path refers to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMountOrigin {
    /// Source path on the host.
    #[default]
    Host,
    /// Source path inside the container.
    Container,
}

/// Directory mounted into a container at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindMount {
    /// Source directory.
    pub src_path: String,
    /// Destination inside the container.
    pub dst_path: String,
    /// Mount direction.
    pub mode: BindMountMode,
    /// Side the source path refers to.
    pub origin: BindMountOrigin,
}

/// Key/value metadata attached to a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Property {
    /// Property key.
    pub key: String,
    /// Property value.
    pub value: String,
}

/// Environment variable passed to a spawned process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub key: String,
    /// Variable value.
    pub value: String,
}

/// Resource limits applied to a spawned process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum address space in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_space: Option<u64>,
    /// Maximum core file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core: Option<u64>,
    /// Maximum CPU time in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u64>,
    /// Maximum file size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fsize: Option<u64>,
    /// Maximum number of open file descriptors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nofile: Option<u64>,
    /// Maximum number of processes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nproc: Option<u64>,
    /// Maximum stack size in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<u64>,
}

nested_fields!(
    Vec<BindMount>,
    Vec<Property>,
    Vec<EnvironmentVariable>,
    Option<ResourceLimits>,
);

request_kinds! {
    /// Creates a container.
    CreateRequest as Create => CreateResponse {
        /// Directories mounted into the container.
        bind_mounts: Vec<BindMount>,
        /// Seconds an idle container survives before it is destroyed.
        grace_time: Option<u32>,
        /// Handle to assign instead of a generated one.
        handle: Option<String>,
        /// Network address range for the container.
        network: Option<String>,
        /// Root filesystem path.
        rootfs: Option<String>,
        /// Metadata attached to the container.
        properties: Vec<Property>,
        /// Environment entries in `KEY=VALUE` form.
        env: Vec<String>,
        /// Whether the container runs privileged.
        privileged: Option<bool>,
    }

    /// Destroys a container.
    DestroyRequest as Destroy => DestroyResponse {
        /// Container handle.
        handle: String,
    }

    /// Asks the server to echo a message back.
    EchoRequest as Echo => EchoResponse {
        /// Message to echo.
        message: String,
    }

    /// Fetches container information.
    InfoRequest as Info => InfoResponse {
        /// Container handle.
        handle: String,
    }

    /// Limits network bandwidth.
    LimitBandwidthRequest as LimitBandwidth => LimitBandwidthResponse {
        /// Container handle.
        handle: String,
        /// Sustained rate in bytes per second.
        rate: Option<u64>,
        /// Burst size in bytes.
        burst: Option<u64>,
    }

    /// Limits CPU shares.
    LimitCpuRequest as LimitCpu => LimitCpuResponse {
        /// Container handle.
        handle: String,
        /// Relative CPU shares.
        limit_in_shares: Option<u64>,
    }

    /// Limits disk usage.
    LimitDiskRequest as LimitDisk => LimitDiskResponse {
        /// Container handle.
        handle: String,
        /// Soft block quota.
        block_soft: Option<u64>,
        /// Hard block quota.
        block_hard: Option<u64>,
        /// Soft inode quota.
        inode_soft: Option<u64>,
        /// Hard inode quota.
        inode_hard: Option<u64>,
        /// Soft byte quota.
        byte_soft: Option<u64>,
        /// Hard byte quota.
        byte_hard: Option<u64>,
    }

    /// Limits memory usage.
    LimitMemoryRequest as LimitMemory => LimitMemoryResponse {
        /// Container handle.
        handle: String,
        /// Memory limit in bytes.
        limit_in_bytes: Option<u64>,
    }

    /// Lists containers.
    ListRequest as List => ListResponse {
        /// Properties a container must carry to be listed.
        properties: Vec<Property>,
    }

    /// Maps a host port to a container port.
    NetInRequest as NetIn => NetInResponse {
        /// Container handle.
        handle: String,
        /// Host port; the server picks one when absent.
        host_port: Option<u32>,
        /// Container port; defaults to the host port.
        container_port: Option<u32>,
    }

    /// Allows outbound traffic from a container.
    NetOutRequest as NetOut => NetOutResponse {
        /// Container handle.
        handle: String,
        /// Destination network in CIDR form.
        network: Option<String>,
        /// Destination port.
        port: Option<u32>,
    }

    /// Checks that the server is alive.
    PingRequest as Ping => PingResponse {}

    /// Spawns a process inside a container.
    RunRequest as Run => RunResponse {
        /// Container handle.
        handle: String,
        /// Script executed by the process.
        script: String,
        /// Whether the process runs privileged.
        privileged: Option<bool>,
        /// Resource limits for the process.
        rlimits: Option<ResourceLimits>,
        /// Whether output is discarded instead of streamed.
        discard_output: Option<bool>,
        /// Tag attached to the process logs.
        log_tag: Option<String>,
        /// Environment passed to the process.
        env: Vec<EnvironmentVariable>,
    }

    /// Attaches to the output of a running process.
    AttachRequest as Attach => ProcessPayload {
        /// Container handle.
        handle: String,
        /// Process to attach to.
        process_id: u32,
    }

    /// Stops every process in a container.
    StopRequest as Stop => StopResponse {
        /// Container handle.
        handle: String,
        /// Return before the processes have exited.
        background: Option<bool>,
        /// Send SIGKILL instead of SIGTERM.
        kill: Option<bool>,
    }

    /// Reports server capacity.
    CapacityRequest as Capacity => CapacityResponse {}

    /// Streams local data into a file inside a container.
    StreamInRequest as StreamIn => StreamInResponse {
        /// Container handle.
        handle: String,
        /// Destination path inside the container.
        dst_path: String,
    }

    /// Streams a file out of a container.
    StreamOutRequest as StreamOut => StreamOutResponse {
        /// Container handle.
        handle: String,
        /// Source path inside the container.
        src_path: String,
    }
}

/// Failure reported by the server in place of a response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    /// Human-readable failure.
    pub message: String,
    /// Additional failure context.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    /// Server-side backtrace lines.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub backtrace: Vec<String>,
}

/// Response to [`CreateRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateResponse {
    /// Handle of the new container.
    pub handle: String,
}

/// Response to [`DestroyRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestroyResponse {}

/// Response to [`EchoRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoResponse {
    /// Echoed message.
    pub message: String,
}

/// Response to [`InfoRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfoResponse {
    /// Lifecycle state, for example `active` or `stopped`.
    pub state: String,
    /// Notable events such as out-of-memory kills.
    pub events: Vec<String>,
    /// Host side of the container's virtual interface.
    pub host_ip: String,
    /// Container side of the virtual interface.
    pub container_ip: String,
    /// Container directory on the host.
    pub container_path: String,
    /// Processes running in the container.
    pub process_ids: Vec<u64>,
    /// Metadata attached at creation.
    pub properties: Vec<Property>,
}

/// Response to [`LimitBandwidthRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitBandwidthResponse {
    /// Effective rate in bytes per second.
    pub rate: u64,
    /// Effective burst size in bytes.
    pub burst: u64,
}

/// Response to [`LimitCpuRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitCpuResponse {
    /// Effective CPU shares.
    pub limit_in_shares: u64,
}

/// Response to [`LimitDiskRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitDiskResponse {
    /// Effective soft block quota.
    pub block_soft: u64,
    /// Effective hard block quota.
    pub block_hard: u64,
    /// Effective soft inode quota.
    pub inode_soft: u64,
    /// Effective hard inode quota.
    pub inode_hard: u64,
    /// Effective soft byte quota.
    pub byte_soft: u64,
    /// Effective hard byte quota.
    pub byte_hard: u64,
}

/// Response to [`LimitMemoryRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitMemoryResponse {
    /// Effective memory limit in bytes.
    pub limit_in_bytes: u64,
}

/// Response to [`ListRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListResponse {
    /// Handles of matching containers.
    pub handles: Vec<String>,
}

/// Response to [`NetInRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetInResponse {
    /// Mapped host port.
    pub host_port: u32,
    /// Mapped container port.
    pub container_port: u32,
}

/// Response to [`NetOutRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetOutResponse {}

/// Response to [`PingRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {}

/// Response to [`RunRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunResponse {
    /// Identifier of the spawned process.
    pub process_id: u32,
}

/// Response to [`StopRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopResponse {}

/// Response to [`CapacityRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityResponse {
    /// Memory available to containers in bytes.
    pub memory_in_bytes: u64,
    /// Disk available to containers in bytes.
    pub disk_in_bytes: u64,
    /// Maximum number of containers.
    pub max_containers: u64,
}

/// Response to [`StreamInRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInResponse {}

/// Response to [`StreamOutRequest`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOutResponse {}

/// Stream a process output fragment was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadSource {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
    /// Standard input.
    Stdin,
}

/// Output fragment or exit status of a process started by `run` or
/// followed by `attach`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessPayload {
    /// Process the payload belongs to.
    pub process_id: u32,
    /// Stream the data was read from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PayloadSource>,
    /// Output fragment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    /// Exit status; present only on the final payload of a process.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_status: Option<u32>,
}

impl ProcessPayload {
    /// Builds an output fragment.
    #[must_use]
    pub fn output(process_id: u32, source: PayloadSource, data: impl Into<String>) -> Self {
        Self {
            process_id,
            source: Some(source),
            data: Some(data.into()),
            exit_status: None,
        }
    }

    /// Builds the final payload carrying the exit status.
    #[must_use]
    pub const fn exited(process_id: u32, exit_status: u32) -> Self {
        Self {
            process_id,
            source: None,
            data: None,
            exit_status: Some(exit_status),
        }
    }

    /// Returns `true` when this payload ends the process stream.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.exit_status.is_some()
    }
}

/// Binary chunk of a `streamIn` or `streamOut` transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamChunk {
    /// Raw bytes, base64 encoded on the wire.
    #[serde(with = "base64_content", skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<u8>>,
    /// End-of-file marker. Only `Some(true)` ends a transfer; an explicit
    /// `false` is an ordinary chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eof: Option<bool>,
}

impl StreamChunk {
    /// Builds a chunk carrying `bytes`.
    #[must_use]
    pub const fn with_content(bytes: Vec<u8>) -> Self {
        Self {
            content: Some(bytes),
            eof: None,
        }
    }

    /// Builds the end-of-file chunk.
    #[must_use]
    pub const fn end_of_file() -> Self {
        Self {
            content: None,
            eof: Some(true),
        }
    }

    /// Returns `true` when the chunk ends the transfer.
    #[must_use]
    pub fn is_eof(&self) -> bool {
        self.eof == Some(true)
    }
}

message_types!(
    ErrorResponse => Error,
    CreateResponse => Create,
    DestroyResponse => Destroy,
    EchoResponse => Echo,
    InfoResponse => Info,
    LimitBandwidthResponse => LimitBandwidth,
    LimitCpuResponse => LimitCpu,
    LimitDiskResponse => LimitDisk,
    LimitMemoryResponse => LimitMemory,
    ListResponse => List,
    NetInResponse => NetIn,
    NetOutResponse => NetOut,
    PingResponse => Ping,
    RunResponse => Run,
    StopResponse => Stop,
    CapacityResponse => Capacity,
    StreamInResponse => StreamIn,
    StreamOutResponse => StreamOut,
    ProcessPayload => ProcessPayload,
    StreamChunk => StreamChunk,
);

mod base64_content {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(content: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match content {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        encoded
            .map(|text| STANDARD.decode(text).map_err(serde::de::Error::custom))
            .transpose()
    }
}
