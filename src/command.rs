use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KvsError, Result};

/// Selects one of the three backing structures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    /// the [`ArrayStore`](crate::ArrayStore)
    Array,
    /// the [`HashStore`](crate::HashStore)
    Hash,
    /// the [`RbTreeStore`](crate::RbTreeStore)
    RbTree,
}

impl Target {
    /// every structure, in reporting order
    pub const ALL: [Target; 3] = [Target::Array, Target::Hash, Target::RbTree];

    /// the name used in requests and in stats
    pub fn name(self) -> &'static str {
        match self {
            Target::Array => "array",
            Target::Hash => "hash",
            Target::RbTree => "rbtree",
        }
    }

    // label used in human readable messages
    fn label(self) -> &'static str {
        match self {
            Target::Array => "Array",
            Target::Hash => "Hash",
            Target::RbTree => "RBTree",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Target {
    type Err = KvsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "array" => Ok(Target::Array),
            "hash" => Ok(Target::Hash),
            "rbtree" => Ok(Target::RbTree),
            other => Err(KvsError::Parsing(format!("unknown target: {}", other))),
        }
    }
}

/// The outcome of a command, every command yields exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// the command succeeded
    Ok,
    /// the key already exists (SET), or exists (EXIST probe)
    Exist,
    /// the key is not present
    NoExist,
    /// the structure is at capacity
    Full,
    /// malformed command or internal fault
    Error,
}

impl From<&KvsError> for Status {
    fn from(e: &KvsError) -> Self {
        match e {
            KvsError::KeyExists => Status::Exist,
            KvsError::KeyNotFound => Status::NoExist,
            KvsError::StoreFull => Status::Full,
            _ => Status::Error,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::Ok => "OK",
            Status::Exist => "EXIST",
            Status::NoExist => "NO_EXIST",
            Status::Full => "FULL",
            Status::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// A request as it arrives from an external caller.
///
/// Fields are kept loose (everything but `cmd` is optional) so that a malformed request can still
/// be represented and answered with an `ERROR` [`Response`]. Use [`Request::parse`] to validate it
/// into a [`Command`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// the verb, e.g. `SET`, `RGET`, `HDEL`
    pub cmd: String,
    /// the key the command addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// the value, required by SET and UPDATE
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// explicit structure selector: `array`, `hash` or `rbtree`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Request {
    /// builds a request for `cmd` on `key`
    pub fn new(cmd: impl Into<String>, key: impl Into<String>) -> Self {
        Request {
            cmd: cmd.into(),
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// sets the value of this request
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// sets the explicit target of this request
    pub fn target(mut self, target: Target) -> Self {
        self.target = Some(target.name().to_string());
        self
    }

    /// Splits a whitespace delimited command line into a request.
    ///
    /// The first token is the verb, the second one the key and all remaining tokens, joined by
    /// a single space, form the value: `SET greeting hello world`.
    pub fn from_line(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default().to_string();
        let key = parts.next().map(String::from);
        let value = parts.collect::<Vec<_>>().join(" ");
        Request {
            cmd,
            key,
            value: if value.is_empty() { None } else { Some(value) },
            target: None,
        }
    }

    /// Validates this request and resolves the structure it addresses.
    ///
    /// # Errors
    /// returns [`KvsError::Command`] for an unknown verb or target, a missing key, a missing
    /// value, or a verb prefix that contradicts the explicit `target`.
    pub fn parse(&self) -> Result<(Target, Command)> {
        let (prefixed, verb) = split_verb(&self.cmd)
            .ok_or_else(|| KvsError::Command("Unknown command".to_string()))?;

        let explicit = match &self.target {
            Some(name) => Some(
                name.parse::<Target>()
                    .map_err(|_| KvsError::Command(format!("Unknown target: {}", name)))?,
            ),
            None => None,
        };
        let target = match (prefixed, explicit) {
            (Some(p), Some(e)) if p != e => {
                return Err(KvsError::Command(format!(
                    "Conflicting target: {} addresses {} but target is {}",
                    self.cmd, p, e
                )))
            }
            (Some(t), _) | (None, Some(t)) => t,
            (None, None) => Target::Array,
        };

        let key = match self.key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => return Err(KvsError::Command("Key required".to_string())),
        };
        let value = || match self.value.as_deref() {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(KvsError::Command("Value required".to_string())),
        };

        let command = match verb {
            Verb::Set => Command::Set {
                key,
                value: value()?,
            },
            Verb::Get => Command::Get { key },
            Verb::Del => Command::Del { key },
            Verb::Update => Command::Update {
                key,
                value: value()?,
            },
            Verb::Exist => Command::Exist { key },
        };
        Ok((target, command))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verb {
    Set,
    Get,
    Del,
    Update,
    Exist,
}

fn verb(s: &str) -> Option<Verb> {
    match s {
        "SET" => Some(Verb::Set),
        "GET" => Some(Verb::Get),
        "DEL" => Some(Verb::Del),
        "UPDATE" | "MOD" => Some(Verb::Update),
        "EXIST" => Some(Verb::Exist),
        _ => None,
    }
}

// an unprefixed verb addresses no structure in particular,
// `R` selects the rbtree and `H` the hash table
fn split_verb(cmd: &str) -> Option<(Option<Target>, Verb)> {
    let cmd = cmd.trim().to_ascii_uppercase();
    if let Some(v) = verb(&cmd) {
        return Some((None, v));
    }
    if let Some(rest) = cmd.strip_prefix('R') {
        return verb(rest).map(|v| (Some(Target::RbTree), v));
    }
    if let Some(rest) = cmd.strip_prefix('H') {
        return verb(rest).map(|v| (Some(Target::Hash), v));
    }
    None
}

/// A validated command, see [`Request::parse`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// insert a new key/value
    Set {
        /// the key to insert
        key: String,
        /// the value to insert
        value: String,
    },
    /// get a value from the store
    Get {
        /// the key to search for
        key: String,
    },
    /// remove a key/value from the store
    Del {
        /// the key to remove
        key: String,
    },
    /// replace the value of an existing key
    Update {
        /// the key to modify
        key: String,
        /// the new value
        value: String,
    },
    /// check whether a key is present
    Exist {
        /// the key to look for
        key: String,
    },
}

impl Command {
    /// the key this command addresses
    pub fn key(&self) -> &str {
        match self {
            Command::Set { key, .. }
            | Command::Get { key }
            | Command::Del { key }
            | Command::Update { key, .. }
            | Command::Exist { key } => key,
        }
    }

    /// returns `true` for commands that may change a structure
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Command::Set { .. } | Command::Del { .. } | Command::Update { .. }
        )
    }
}

/// The response returned for every [`Request`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// the outcome of the command
    pub status: Status,
    /// a human readable description, the value itself for a successful GET
    pub message: String,
    /// the value, only present for a successful GET
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// stats of every structure, taken right after the command ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Stats>,
}

impl Response {
    /// a response without a value
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Response {
            status,
            message: message.into(),
            value: None,
            data: None,
        }
    }

    /// the response to a successful GET
    pub fn found(value: String) -> Self {
        Response {
            status: Status::Ok,
            message: value.clone(),
            value: Some(value),
            data: None,
        }
    }

    /// maps an error raised while serving a command on `target` into a response
    pub fn from_error(e: &KvsError, target: Target) -> Self {
        let message = match e {
            KvsError::StoreFull => format!("{} storage full", target.label()),
            other => other.to_string(),
        };
        Response::new(Status::from(e), message)
    }

    /// attaches a stats snapshot
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.data = Some(stats);
        self
    }

    /// returns `true` if the status is `OK`
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)
    }
}

/// Capacity accounting of one backing structure
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    /// live records
    pub count: usize,
    /// `max - count`
    pub remaining: usize,
    /// the capacity
    pub max: usize,
}

/// Stats of all three structures, keyed by structure name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// the array structure
    pub array: StoreStats,
    /// the hash structure
    pub hash: StoreStats,
    /// the red-black tree structure
    pub rbtree: StoreStats,
}

impl Stats {
    /// the stats of one structure
    pub fn get(&self, target: Target) -> StoreStats {
        match target {
            Target::Array => self.array,
            Target::Hash => self.hash,
            Target::RbTree => self.rbtree,
        }
    }
}
