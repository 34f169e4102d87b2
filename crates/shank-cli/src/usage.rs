//! Static help text and flag overrides for synthesized commands.

/// Help text and flag overrides for one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CommandUsage {
    /// Command the entry documents.
    pub(crate) command: &'static str,
    /// One-line summary shown in command listings.
    pub(crate) usage: &'static str,
    /// Longer description shown by `<command> --help`.
    pub(crate) description: &'static str,
    /// Per-field overrides.
    pub(crate) flags: &'static [FlagUsage],
}

/// Override for the flag generated from one request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FlagUsage {
    /// Request field the override applies to.
    pub(crate) field: &'static str,
    /// Replacement flag name.
    pub(crate) flag: Option<&'static str>,
    /// Replacement help text; empty keeps the derived text.
    pub(crate) help: &'static str,
}

const fn help(field: &'static str, help: &'static str) -> FlagUsage {
    FlagUsage {
        field,
        flag: None,
        help,
    }
}

const fn renamed(field: &'static str, flag: &'static str, help: &'static str) -> FlagUsage {
    FlagUsage {
        field,
        flag: Some(flag),
        help,
    }
}

const HANDLE: FlagUsage = help("handle", "container handle");

/// Usage entries for the warden commands.
pub(crate) static USAGE: &[CommandUsage] = &[
    CommandUsage {
        command: "create",
        usage: "Create a container.",
        description: "Creates a container and prints its handle.",
        flags: &[
            help("grace_time", "seconds an idle container survives"),
            help("handle", "handle to assign instead of a generated one"),
            help("network", "network address range for the container"),
            help("rootfs", "root filesystem path"),
            help("env", "environment entry in KEY=VALUE form; may repeat"),
            help("privileged", "run the container privileged"),
        ],
    },
    CommandUsage {
        command: "destroy",
        usage: "Destroy a container.",
        description: "Stops every process in the container and removes it.",
        flags: &[HANDLE],
    },
    CommandUsage {
        command: "echo",
        usage: "Echo a message.",
        description: "Sends a message that the server returns unchanged.",
        flags: &[help("message", "message to echo")],
    },
    CommandUsage {
        command: "info",
        usage: "Show container info.",
        description: "Prints the state, addresses and processes of a container.",
        flags: &[HANDLE],
    },
    CommandUsage {
        command: "limitBandwidth",
        usage: "Limit container bandwidth.",
        description: "Sets the network rate and burst limits of a container.",
        flags: &[
            HANDLE,
            help("rate", "sustained rate in bytes per second"),
            help("burst", "burst size in bytes"),
        ],
    },
    CommandUsage {
        command: "limitCpu",
        usage: "Limit container CPU shares.",
        description: "Sets the relative CPU shares of a container.",
        flags: &[HANDLE, renamed("limit_in_shares", "shares", "CPU shares")],
    },
    CommandUsage {
        command: "limitDisk",
        usage: "Limit container disk usage.",
        description: "Sets block, inode and byte quotas for a container.",
        flags: &[
            HANDLE,
            help("block_soft", "soft block quota"),
            help("block_hard", "hard block quota"),
            help("inode_soft", "soft inode quota"),
            help("inode_hard", "hard inode quota"),
            help("byte_soft", "soft byte quota"),
            help("byte_hard", "hard byte quota"),
        ],
    },
    CommandUsage {
        command: "limitMemory",
        usage: "Limit container memory.",
        description: "Sets the memory limit of a container.",
        flags: &[HANDLE, renamed("limit_in_bytes", "limit", "memory limit in bytes")],
    },
    CommandUsage {
        command: "list",
        usage: "List containers.",
        description: "Prints the handles of every container.",
        flags: &[],
    },
    CommandUsage {
        command: "netIn",
        usage: "Map a host port into a container.",
        description: "Forwards a host port to a container port.",
        flags: &[
            HANDLE,
            help("host_port", "host port; the server picks one when omitted"),
            help("container_port", "container port; defaults to the host port"),
        ],
    },
    CommandUsage {
        command: "netOut",
        usage: "Allow outbound traffic.",
        description: "Whitelists an outbound network and port for a container.",
        flags: &[
            HANDLE,
            help("network", "destination network in CIDR form"),
            help("port", "destination port"),
        ],
    },
    CommandUsage {
        command: "ping",
        usage: "Ping the server.",
        description: "",
        flags: &[],
    },
    CommandUsage {
        command: "run",
        usage: "Run a script in a container.",
        description: "Spawns a process and streams its output until it exits.",
        flags: &[
            HANDLE,
            help("script", "script to execute"),
            help("privileged", "run the process privileged"),
            help("discard_output", "discard output instead of streaming it"),
            help("log_tag", "tag attached to the process logs"),
        ],
    },
    CommandUsage {
        command: "attach",
        usage: "Attach to a running process.",
        description: "Streams the output of a process until it exits.",
        flags: &[HANDLE, renamed("process_id", "pid", "process to attach to")],
    },
    CommandUsage {
        command: "stop",
        usage: "Stop a container.",
        description: "Stops every process in a container.",
        flags: &[
            HANDLE,
            help("background", "return before the processes have exited"),
            help("kill", "send SIGKILL instead of SIGTERM"),
        ],
    },
    CommandUsage {
        command: "capacity",
        usage: "Show server capacity.",
        description: "",
        flags: &[],
    },
    CommandUsage {
        command: "streamIn",
        usage: "Stream stdin into a container file.",
        description: "Copies standard input to a file inside the container.",
        flags: &[HANDLE, renamed("dst_path", "to", "destination path in the container")],
    },
    CommandUsage {
        command: "streamOut",
        usage: "Stream a container file to stdout.",
        description: "Copies a file from inside the container to standard output.",
        flags: &[HANDLE, renamed("src_path", "from", "source path in the container")],
    },
];

/// Finds the entry documenting `command`.
pub(crate) fn lookup(table: &'static [CommandUsage], command: &str) -> Option<&'static CommandUsage> {
    table.iter().find(|entry| entry.command == command)
}
