//! Custom value parsers for CLI arguments.

use kiln_template::{parse_setting_pair, Value};

/// Parse a `KEY=VALUE` setting, the value as JSON when it parses as JSON
pub fn parse_setting(s: &str) -> Result<(String, Value), String> {
    parse_setting_pair(s).map_err(|e| e.to_string())
}

/// Parse a template name, which must be a plain directory name
pub fn parse_template_name(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Template name cannot be empty".to_string());
    }
    if s.starts_with('.') || s.contains(['/', '\\']) {
        return Err(format!("Invalid template name: {s}"));
    }
    Ok(s.to_string())
}
