//! Command synthesis from request schemas.
//!
//! [`synthesize`] turns an empty request value into a [`CommandDescriptor`]:
//! a named command with one flag per flag-eligible field and an action bound
//! to the request kind. The descriptor can also move values in both
//! directions between parsed flags and request values, which keeps flag
//! parsing a pure by-name copy.

use clap::parser::MatchesError;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use shank_protocol::{FieldError, FieldType, FieldValue, RequestKind};
use thiserror::Error;
use tracing::debug;

use crate::action::{ActionContext, CommandAction, invoke};
use crate::errors::AppError;
use crate::schema::{ExchangePattern, FieldSpec, RequestSchema, command_name};
use crate::usage::{self, CommandUsage};

const SYNTHESIS_TARGET: &str = "shank::synthesis";

/// Errors raised while building the command set.
#[derive(Debug, Error)]
pub(crate) enum SynthesisError {
    /// A usage override names a field the request kind does not expose as a
    /// flag.
    #[error("usage for `{command}` overrides unknown field `{field}`")]
    UnknownOverride { command: String, field: String },
    /// Two fields share one flag name, or a field claims a reserved flag.
    #[error("command `{command}` defines flag `--{flag}` more than once")]
    DuplicateFlag { command: String, flag: String },
    /// Two request kinds derive the same command name.
    #[error("command `{0}` is defined more than once")]
    DuplicateCommand(String),
    /// A request kind derives a name reserved for a built-in command.
    #[error("command `{0}` is reserved")]
    ReservedCommand(String),
    /// A usage entry documents a command no request kind derives.
    #[error("usage documents unknown command `{0}`")]
    UnknownUsage(String),
}

/// Errors raised while copying parsed flags into a request.
#[derive(Debug, Error)]
pub(crate) enum PopulateError {
    /// clap could not hand back the flag value in the expected type.
    #[error("cannot read flag `--{flag}`: {source}")]
    Flag {
        flag: String,
        #[source]
        source: MatchesError,
    },
    /// The value does not fit the request field.
    #[error("invalid value for `--{flag}`: {source}")]
    Field {
        flag: String,
        #[source]
        source: FieldError,
    },
}

/// One synthesized flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FlagDefinition {
    pub(crate) field: &'static str,
    pub(crate) name: String,
    pub(crate) field_type: FieldType,
    pub(crate) required: bool,
    pub(crate) default: Option<FieldValue>,
    pub(crate) help: String,
}

impl FlagDefinition {
    fn from_spec(spec: FieldSpec, default: Option<FieldValue>) -> Self {
        Self {
            field: spec.field,
            name: spec.flag,
            field_type: spec.field_type,
            required: spec.required,
            default: if spec.required { None } else { default },
            help: spec.help,
        }
    }

    fn arg(&self) -> Arg {
        let arg = Arg::new(self.name.clone())
            .long(self.name.clone())
            .help(self.help.clone())
            .required(self.required);
        let typed = match self.field_type {
            FieldType::String => arg
                .value_name("STRING")
                .action(ArgAction::Set)
                .value_parser(value_parser!(String)),
            FieldType::Integer => arg
                .value_name("N")
                .action(ArgAction::Set)
                .value_parser(value_parser!(u64)),
            FieldType::Boolean => arg
                .value_name("BOOL")
                .action(ArgAction::Set)
                .num_args(0..=1)
                .require_equals(true)
                .default_missing_value("true")
                .value_parser(value_parser!(bool)),
            FieldType::RepeatedString => arg
                .value_name("STRING")
                .action(ArgAction::Append)
                .value_parser(value_parser!(String)),
        };
        match &self.default {
            Some(default) => typed.default_value(default.to_string()),
            None => typed,
        }
    }

    fn read(&self, matches: &ArgMatches) -> Result<Option<FieldValue>, PopulateError> {
        let flag_error = |source| PopulateError::Flag {
            flag: self.name.clone(),
            source,
        };
        let value = match self.field_type {
            FieldType::String => matches
                .try_get_one::<String>(&self.name)
                .map_err(flag_error)?
                .cloned()
                .map(FieldValue::String),
            FieldType::Integer => matches
                .try_get_one::<u64>(&self.name)
                .map_err(flag_error)?
                .copied()
                .map(FieldValue::Integer),
            FieldType::Boolean => matches
                .try_get_one::<bool>(&self.name)
                .map_err(flag_error)?
                .copied()
                .map(FieldValue::Boolean),
            FieldType::RepeatedString => matches
                .try_get_many::<String>(&self.name)
                .map_err(flag_error)?
                .map(|values| FieldValue::Strings(values.cloned().collect())),
        };
        Ok(value)
    }

    fn tokens(&self, value: FieldValue) -> Vec<String> {
        match value {
            FieldValue::Strings(values) => values
                .into_iter()
                .map(|item| format!("--{}={item}", self.name))
                .collect(),
            single => vec![format!("--{}={single}", self.name)],
        }
    }
}

/// A synthesized command bound to one request kind.
#[derive(Debug, Clone)]
pub(crate) struct CommandDescriptor {
    pub(crate) name: String,
    pub(crate) kind_name: &'static str,
    pub(crate) about: Option<&'static str>,
    pub(crate) long_about: Option<&'static str>,
    pub(crate) flags: Vec<FlagDefinition>,
    pub(crate) pattern: ExchangePattern,
    action: CommandAction,
}

impl CommandDescriptor {
    /// Builds the clap subcommand for this descriptor.
    pub(crate) fn command(&self) -> Command {
        Command::new(self.name.clone())
            .about(self.about)
            .long_about(self.long_about)
            .args(self.flags.iter().map(FlagDefinition::arg))
    }

    /// Builds a request by copying each parsed flag into its field by name.
    pub(crate) fn populate<K: RequestKind>(&self, matches: &ArgMatches) -> Result<K, PopulateError> {
        let mut request = K::default();
        for flag in &self.flags {
            if let Some(value) = flag.read(matches)? {
                request
                    .set_field(flag.field, value)
                    .map_err(|source| PopulateError::Field {
                        flag: flag.name.clone(),
                        source,
                    })?;
            }
        }
        Ok(request)
    }

    /// Renders the flag tokens that would populate `request`.
    pub(crate) fn arguments_for<K: RequestKind>(&self, request: &K) -> Vec<String> {
        self.flags
            .iter()
            .filter_map(|flag| request.field(flag.field).map(|value| flag.tokens(value)))
            .flatten()
            .collect()
    }

    /// Runs the bound action against parsed subcommand flags.
    pub(crate) fn invoke(
        &self,
        matches: &ArgMatches,
        context: &mut ActionContext<'_>,
    ) -> Result<(), AppError> {
        (self.action)(self, matches, context)
    }
}

/// Synthesizes the command for the kind of `kind`.
///
/// `table` supplies help text and flag overrides; a kind it does not
/// document still yields a usable command. Defaults come from the fields of
/// `kind` itself, which callers pass empty.
pub(crate) fn synthesize<K: RequestKind>(
    kind: &K,
    table: &'static [CommandUsage],
) -> Result<CommandDescriptor, SynthesisError> {
    let entry = usage::lookup(table, &command_name(K::KIND_NAME));
    let schema = RequestSchema::derive::<K>(entry)?;
    let flags: Vec<FlagDefinition> = schema
        .fields
        .into_iter()
        .map(|spec| {
            let default = kind.field(spec.field);
            FlagDefinition::from_spec(spec, default)
        })
        .collect();
    debug!(
        target: SYNTHESIS_TARGET,
        command = %schema.command,
        kind = schema.kind_name,
        pattern = %schema.pattern,
        flags = flags.len(),
        documented = entry.is_some(),
        "synthesized command"
    );
    Ok(CommandDescriptor {
        name: schema.command,
        kind_name: schema.kind_name,
        about: entry.map(|usage| usage.usage),
        long_about: entry
            .map(|usage| usage.description)
            .filter(|description| !description.is_empty()),
        flags,
        pattern: schema.pattern,
        action: invoke::<K>,
    })
}
