//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Candidate plan request sent to the advisor
pub const ADVISOR: &str = include_str!("../../prompts/advisor.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "advisor" => Some(ADVISOR),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_advisor() {
        let advisor = get_embedded("advisor").unwrap();
        assert!(advisor.contains("{{catalog}}"));
        assert!(advisor.contains("{{schema}}"));
        assert!(advisor.contains("\"ddl\", \"migrations\" and \"queries\""));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("unknown-template").is_none());
    }
}
