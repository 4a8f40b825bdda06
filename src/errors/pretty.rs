//! ANSI rendering for console diagnostics. The library itself never prints;
//! these helpers are for whatever binary fronts the pipeline.

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_ERROR: &str = "\x1b[91m";
const ANSI_SUCCESS: &str = "\x1b[92m";

pub fn error_line(message: &str) -> String {
    format!("{}{}{}", ANSI_ERROR, message, ANSI_RESET)
}

pub fn success_line(message: &str) -> String {
    format!("{}{}{}", ANSI_SUCCESS, message, ANSI_RESET)
}
