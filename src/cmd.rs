//! # Commands
//!
//! An outbound command is a verb plus an ordered list of opaque byte
//! arguments. On the wire it becomes a RESP array of bulk strings, one bulk
//! per verb token and one per argument; multi-word verbs such as
//! `CLIENT GETNAME` carry one token per word.
//!
//! Only a small catalogue of constructors is provided here. The full command
//! surface belongs to a higher layer; the engine treats every command the
//! same way.

use bytes::Bytes;

/// The verbs covered by the catalogue stubs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Ping,
    Echo,
    Get,
    Set,
    Del,
    Exists,
    Incr,
    ClientGetName,
    ClientSetName,
    Quit,
}

impl Verb {
    /// The wire tokens for this verb; each is sent as its own bulk string.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Verb::Ping => &["PING"],
            Verb::Echo => &["ECHO"],
            Verb::Get => &["GET"],
            Verb::Set => &["SET"],
            Verb::Del => &["DEL"],
            Verb::Exists => &["EXISTS"],
            Verb::Incr => &["INCR"],
            Verb::ClientGetName => &["CLIENT", "GETNAME"],
            Verb::ClientSetName => &["CLIENT", "SETNAME"],
            Verb::Quit => &["QUIT"],
        }
    }
}

/// One outbound command.
///
/// Arguments are opaque bytes; the caller chooses how to derive them from
/// text. Commands are constructed, serialised into the send buffer, and
/// discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: Verb,
    args: Vec<Bytes>,
}

impl Command {
    pub fn new(verb: Verb) -> Self {
        Self {
            verb,
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn verb_tokens(&self) -> &'static [&'static str] {
        self.verb.tokens()
    }

    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    pub fn ping() -> Self {
        Self::new(Verb::Ping)
    }

    pub fn echo(message: impl Into<Bytes>) -> Self {
        Self::new(Verb::Echo).arg(message)
    }

    pub fn get(key: impl Into<Bytes>) -> Self {
        Self::new(Verb::Get).arg(key)
    }

    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new(Verb::Set).arg(key).arg(value)
    }

    pub fn del(key: impl Into<Bytes>) -> Self {
        Self::new(Verb::Del).arg(key)
    }

    pub fn exists(key: impl Into<Bytes>) -> Self {
        Self::new(Verb::Exists).arg(key)
    }

    pub fn incr(key: impl Into<Bytes>) -> Self {
        Self::new(Verb::Incr).arg(key)
    }

    pub fn client_getname() -> Self {
        Self::new(Verb::ClientGetName)
    }

    pub fn client_setname(name: impl Into<Bytes>) -> Self {
        Self::new(Verb::ClientSetName).arg(name)
    }

    pub fn quit() -> Self {
        Self::new(Verb::Quit)
    }
}
