//! User commands and driver input.
//!
//! A line starting with `/` is a command; anything else is a message for the
//! active conversation.
//!
//! | command              | effect                                   |
//! |----------------------|------------------------------------------|
//! | `/connect`           | open the connection                      |
//! | `/disconnect`        | close the connection                     |
//! | `/open <partner>`    | make `partner` the active conversation   |
//! | `/to <partner> <msg>`| send to a specific partner               |
//! | `/unlock <secret>`   | re-authenticate a frozen session         |
//! | `/logout`            | end the session                          |
//! | `/quit`              | end the session and exit                 |

use thiserror::Error;
use trustline_core::Credential;
use trustline_proto::Identity;

/// Command parse failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Line is blank.
    #[error("empty input")]
    Empty,

    /// Unknown `/command`.
    #[error("unknown command: /{0}")]
    Unknown(String),

    /// Required argument missing.
    #[error("/{command} needs {argument}")]
    MissingArgument {
        /// Command name.
        command: &'static str,
        /// What was expected.
        argument: &'static str,
    },
}

/// A user intent.
#[derive(Debug, Clone)]
pub enum Command {
    /// Open the connection.
    Connect,
    /// Close the connection.
    Disconnect,
    /// Send to a specific partner.
    Send {
        /// Recipient.
        partner: Identity,
        /// Message text.
        content: String,
    },
    /// Send to the active partner.
    SendToActive {
        /// Message text.
        content: String,
    },
    /// Make a conversation active.
    Select {
        /// Conversation to open.
        partner: Identity,
    },
    /// Submit a credential to clear a freeze.
    Unlock(Credential),
    /// End the session.
    Logout,
    /// End the session and exit.
    Quit,
}

impl Command {
    /// Parse one line of user input.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Err(CommandError::Empty);
        }

        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::SendToActive { content: line.to_string() });
        };

        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let args = args.trim_start();
        match name {
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "logout" => Ok(Self::Logout),
            "quit" | "exit" => Ok(Self::Quit),
            "open" => {
                let partner = partner_arg("open", args)?;
                Ok(Self::Select { partner })
            },
            "to" => {
                let (partner, content) =
                    args.split_once(char::is_whitespace).unwrap_or((args, ""));
                let partner = partner_arg("to", partner)?;
                if content.trim().is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "to",
                        argument: "a message",
                    });
                }
                Ok(Self::Send { partner, content: content.to_string() })
            },
            "unlock" => {
                let secret = args.trim();
                if secret.is_empty() {
                    return Err(CommandError::MissingArgument {
                        command: "unlock",
                        argument: "a PIN or password",
                    });
                }
                Ok(Self::Unlock(Credential::new(secret)))
            },
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

fn partner_arg(command: &'static str, raw: &str) -> Result<Identity, CommandError> {
    Identity::new(raw).map_err(|_| CommandError::MissingArgument { command, argument: "a partner" })
}

/// Input delivered by a [`crate::Driver`].
///
/// Generic over `I` (Instant type) so tests can use virtual time.
#[derive(Debug, Clone)]
pub enum Input<I> {
    /// User intent.
    Command(Command),
    /// Transport handshake completed.
    Opened {
        /// Attempt passed to [`crate::Driver::open`].
        attempt: u64,
    },
    /// Transport closed or failed.
    Closed {
        /// Attempt passed to [`crate::Driver::open`].
        attempt: u64,
        /// Human-readable cause.
        reason: String,
    },
    /// Text frame from the server.
    Frame(String),
    /// Periodic tick.
    Tick(I),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(name: &str) -> Identity {
        Identity::new(name).unwrap()
    }

    #[test]
    fn plain_text_goes_to_active_partner() {
        let Command::SendToActive { content } = Command::parse("  hello there\n").unwrap() else {
            panic!("expected SendToActive");
        };
        assert_eq!(content, "  hello there");
    }

    #[test]
    fn to_splits_partner_and_message() {
        let Command::Send { partner, content } = Command::parse("/to bob see you at 5").unwrap()
        else {
            panic!("expected Send");
        };
        assert_eq!(partner, id("bob"));
        assert_eq!(content, "see you at 5");
    }

    #[test]
    fn to_without_message_fails() {
        assert_eq!(
            Command::parse("/to bob").unwrap_err(),
            CommandError::MissingArgument { command: "to", argument: "a message" }
        );
    }

    #[test]
    fn open_requires_partner() {
        assert!(matches!(
            Command::parse("/open carol"),
            Ok(Command::Select { partner }) if partner == id("carol")
        ));
        assert!(matches!(Command::parse("/open"), Err(CommandError::MissingArgument { .. })));
    }

    #[test]
    fn unlock_keeps_secret_out_of_debug() {
        let command = Command::parse("/unlock 123456").unwrap();
        let Command::Unlock(credential) = &command else {
            panic!("expected Unlock");
        };
        assert_eq!(credential.expose(), "123456");
        assert!(!format!("{command:?}").contains("123456"));
    }

    #[test]
    fn unknown_and_empty() {
        assert_eq!(Command::parse("/dance").unwrap_err(), CommandError::Unknown("dance".into()));
        assert_eq!(Command::parse("   ").unwrap_err(), CommandError::Empty);
        assert!(matches!(Command::parse("/quit"), Ok(Command::Quit)));
        assert!(matches!(Command::parse("/logout"), Ok(Command::Logout)));
    }
}
