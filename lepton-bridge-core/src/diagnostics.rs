//! Diagnostics and error reporting for the bridge
//!
//! Every failure is fatal to the run: the CLI prints one line from
//! [`format_fatal`] to stderr and exits with [`exit_code`].

use crate::error::BridgeError;
use std::error::Error;

/// Exit code for a failed run
pub const EXIT_FAILURE: i32 = 1;

/// Format an error as a single diagnostic line, including its sources
pub fn format_fatal(error: &BridgeError) -> String {
    let mut msg = format!("fatal {} error: {}", error.category(), error);
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !msg.ends_with(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
        source = cause.source();
    }
    msg.replace('\n', " ")
}

/// Process exit code for an error. No condition is retried, so all map to
/// the same code.
pub fn exit_code(_error: &BridgeError) -> i32 {
    EXIT_FAILURE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::runtime::RuntimeInitError;

    #[test]
    fn fatal_line_names_the_category() {
        let err = BridgeError::from(RuntimeInitError::Create("JNI_ERR".into()));
        assert_eq!(
            format_fatal(&err),
            "fatal runtime error: cannot create foreign runtime: JNI_ERR"
        );
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn fatal_line_stays_on_one_line() {
        let err = BridgeError::from(ConfigError::Invalid("line one\nline two".into()));
        let line = format_fatal(&err);
        assert!(!line.contains('\n'));
        assert!(line.starts_with("fatal configuration error"));
    }
}
