/// Commands a client can send over the nation protocol.
///
/// The first whitespace-delimited token, lower-cased, picks the command.
/// Arguments keep their original case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Hand out a recruitable nation
    Get,
    /// Give back a rented nation, carried as a JSON object
    Return { payload: String },
    /// Ask whether a nation is recruitable
    Check { name: String },
    /// Client is done; close without a sentinel
    End,
    /// Anything we don't understand
    Unknown(String),
}

impl Command {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (head, rest) = match raw.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (raw, ""),
        };
        match head.to_lowercase().as_str() {
            "get" => Command::Get,
            "end" => Command::End,
            "return" if !rest.is_empty() => Command::Return {
                payload: rest.to_string(),
            },
            "check" if !rest.is_empty() => Command::Check {
                name: rest.to_string(),
            },
            _ => Command::Unknown(raw.to_string()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Get => "get",
            Command::Return { .. } => "return",
            Command::Check { .. } => "check",
            Command::End => "end",
            Command::Unknown(_) => "unknown",
        }
    }
}
