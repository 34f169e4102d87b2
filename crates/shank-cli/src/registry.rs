//! The command set, built once at startup.

use shank_protocol::{
    AttachRequest, CapacityRequest, CreateRequest, DestroyRequest, EchoRequest, InfoRequest,
    LimitBandwidthRequest, LimitCpuRequest, LimitDiskRequest, LimitMemoryRequest, ListRequest,
    NetInRequest, NetOutRequest, PingRequest, RequestKind, RunRequest, StopRequest,
    StreamInRequest, StreamOutRequest,
};

use crate::synthesizer::{CommandDescriptor, SynthesisError, synthesize};
use crate::usage::{CommandUsage, USAGE};

/// Name of the built-in command that persists connection settings.
pub(crate) const TARGET_COMMAND: &str = "target";

type DescriptorFactory = fn(&'static [CommandUsage]) -> Result<CommandDescriptor, SynthesisError>;

fn descriptor_for<K: RequestKind>(
    table: &'static [CommandUsage],
) -> Result<CommandDescriptor, SynthesisError> {
    synthesize(&K::default(), table)
}

const KINDS: &[DescriptorFactory] = &[
    descriptor_for::<CreateRequest>,
    descriptor_for::<DestroyRequest>,
    descriptor_for::<EchoRequest>,
    descriptor_for::<InfoRequest>,
    descriptor_for::<LimitBandwidthRequest>,
    descriptor_for::<LimitCpuRequest>,
    descriptor_for::<LimitDiskRequest>,
    descriptor_for::<LimitMemoryRequest>,
    descriptor_for::<ListRequest>,
    descriptor_for::<NetInRequest>,
    descriptor_for::<NetOutRequest>,
    descriptor_for::<PingRequest>,
    descriptor_for::<RunRequest>,
    descriptor_for::<AttachRequest>,
    descriptor_for::<StopRequest>,
    descriptor_for::<CapacityRequest>,
    descriptor_for::<StreamInRequest>,
    descriptor_for::<StreamOutRequest>,
];

/// Every synthesized command, in registration order.
#[derive(Debug, Default)]
pub(crate) struct CommandRegistry {
    commands: Vec<CommandDescriptor>,
}

impl CommandRegistry {
    /// Builds the warden command set with the built-in usage table.
    pub(crate) fn build() -> Result<Self, SynthesisError> {
        Self::build_with(USAGE)
    }

    /// Builds the warden command set documented by `table`.
    ///
    /// A usage entry for a command no request kind derives is rejected.
    pub(crate) fn build_with(table: &'static [CommandUsage]) -> Result<Self, SynthesisError> {
        let mut registry = Self::default();
        for factory in KINDS {
            registry.register(factory(table)?)?;
        }
        if let Some(orphan) = table
            .iter()
            .find(|entry| registry.get(entry.command).is_none())
        {
            return Err(SynthesisError::UnknownUsage(orphan.command.to_owned()));
        }
        Ok(registry)
    }

    /// Adds `descriptor`, rejecting duplicate and reserved names.
    pub(crate) fn register(&mut self, descriptor: CommandDescriptor) -> Result<(), SynthesisError> {
        if descriptor.name == TARGET_COMMAND {
            return Err(SynthesisError::ReservedCommand(descriptor.name));
        }
        if self.get(&descriptor.name).is_some() {
            return Err(SynthesisError::DuplicateCommand(descriptor.name));
        }
        self.commands.push(descriptor);
        Ok(())
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CommandDescriptor> {
        self.commands.iter().find(|descriptor| descriptor.name == name)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.iter()
    }
}
