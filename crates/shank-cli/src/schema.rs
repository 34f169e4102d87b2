//! Request schemas derived from compile-time request metadata.
//!
//! A [`RequestSchema`] is the flag-facing view of one request kind: the
//! command name, the ordered flag-eligible fields with any usage-table
//! overrides applied, and the exchange pattern the command runs.

use std::collections::HashSet;

use shank_protocol::{FieldType, REQUEST_SUFFIX, RequestKind};
use strum::Display;

use crate::synthesizer::SynthesisError;
use crate::usage::CommandUsage;

/// Flag name clap reserves on every subcommand.
const RESERVED_FLAGS: &[&str] = &["help"];

/// Shape of the message traffic needed to complete one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub(crate) enum ExchangePattern {
    /// One request, one response.
    Simple,
    /// A response, then process payloads until one carries an exit status.
    RunLike,
    /// Process payloads until one carries an exit status; no response.
    AttachLike,
    /// A response, then raw chunks written to stdout until end of file.
    StreamOut,
    /// A response, local input forwarded as chunks, then a final response.
    StreamIn,
}

impl ExchangePattern {
    /// Selects the pattern run by the named command.
    pub(crate) fn for_command(name: &str) -> Self {
        match name {
            "run" => Self::RunLike,
            "attach" => Self::AttachLike,
            "streamOut" => Self::StreamOut,
            "streamIn" => Self::StreamIn,
            _ => Self::Simple,
        }
    }
}

/// Derives a command name from a request kind name.
///
/// The `Request` suffix is stripped and the first character lower-cased, so
/// `NetInRequest` becomes `netIn`.
pub(crate) fn command_name(kind_name: &str) -> String {
    let stem = kind_name.strip_suffix(REQUEST_SUFFIX).unwrap_or(kind_name);
    let mut chars = stem.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

/// Default flag name for a field: lower-case kebab form of the field name.
pub(crate) fn flag_name(field: &str) -> String {
    field.to_lowercase().replace('_', "-")
}

fn derived_help(field: &str) -> String {
    field.replace('_', " ")
}

/// One flag-eligible request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldSpec {
    pub(crate) field: &'static str,
    pub(crate) flag: String,
    pub(crate) field_type: FieldType,
    pub(crate) required: bool,
    pub(crate) help: String,
}

/// Flag-facing description of one request kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RequestSchema {
    pub(crate) kind_name: &'static str,
    pub(crate) command: String,
    pub(crate) fields: Vec<FieldSpec>,
    pub(crate) pattern: ExchangePattern,
}

impl RequestSchema {
    /// Derives the schema of `K`, applying overrides from `usage`.
    ///
    /// Fails when an override names a field that is not a flag-eligible
    /// field of `K`, or when two fields end up behind the same flag.
    pub(crate) fn derive<K: RequestKind>(
        usage: Option<&CommandUsage>,
    ) -> Result<Self, SynthesisError> {
        let command = command_name(K::KIND_NAME);
        let overrides = usage.map_or(&[][..], |entry| entry.flags);

        if let Some(unknown) = overrides.iter().find(|entry| {
            !K::FIELDS
                .iter()
                .any(|field| field.name == entry.field && field.shape.flag().is_some())
        }) {
            return Err(SynthesisError::UnknownOverride {
                command,
                field: unknown.field.to_owned(),
            });
        }

        let mut seen = HashSet::new();
        let mut fields = Vec::new();
        for info in K::FIELDS {
            let Some((field_type, required)) = info.shape.flag() else {
                continue;
            };
            let field_override = overrides.iter().find(|entry| entry.field == info.name);
            let flag = field_override
                .and_then(|entry| entry.flag)
                .map_or_else(|| flag_name(info.name), str::to_owned);
            if RESERVED_FLAGS.contains(&flag.as_str()) || !seen.insert(flag.clone()) {
                return Err(SynthesisError::DuplicateFlag { command, flag });
            }
            let help = field_override
                .map(|entry| entry.help)
                .filter(|help| !help.is_empty())
                .map_or_else(|| derived_help(info.name), str::to_owned);
            fields.push(FieldSpec {
                field: info.name,
                flag,
                field_type,
                required,
                help,
            });
        }

        let pattern = ExchangePattern::for_command(&command);
        Ok(Self {
            kind_name: K::KIND_NAME,
            command,
            fields,
            pattern,
        })
    }
}
