//! Torznab protocol errors.

use quick_xml::{
    events::{BytesDecl, BytesStart, Event},
    Writer,
};
use std::fmt;
use std::io::Cursor;

/// Request-fatal error, rendered as `<error code=".." description=".."/>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorznabError {
    pub code: u16,
    pub description: String,
    /// HTTP status to answer with.
    pub status: u16,
}

impl TorznabError {
    pub fn new(code: u16, description: impl Into<String>, status: u16) -> Self {
        Self {
            code,
            description: description.into(),
            status,
        }
    }

    /// Bad or missing API key. The message never says which.
    pub fn insufficient_privileges() -> Self {
        Self::new(102, "Insufficient privileges", 401)
    }

    pub fn incorrect_parameter(msg: impl fmt::Display) -> Self {
        Self::new(201, format!("Incorrect parameter: {}", msg), 400)
    }

    pub fn function_not_available(msg: impl fmt::Display) -> Self {
        Self::new(203, format!("Function not available: {}", msg), 400)
    }

    pub fn unknown(msg: impl fmt::Display) -> Self {
        Self::new(900, format!("Unknown error: {}", msg), 500)
    }

    pub fn to_xml(&self) -> String {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .ok();

        let mut error = BytesStart::new("error");
        error.push_attribute(("code", self.code.to_string().as_str()));
        error.push_attribute(("description", self.description.as_str()));
        writer.write_event(Event::Empty(error)).ok();

        String::from_utf8(writer.into_inner().into_inner()).unwrap_or_default()
    }
}

impl fmt::Display for TorznabError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "torznab error {}: {}", self.code, self.description)
    }
}

impl std::error::Error for TorznabError {}
