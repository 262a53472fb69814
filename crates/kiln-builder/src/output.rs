//! Builder output parsing.

use std::sync::OnceLock;

use regex::Regex;

fn image_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"AMI:\s+(\S+)").expect("image id pattern is valid"))
}

/// Image id from the last `AMI: <id>` line of builder output.
pub fn extract_image_id(output: &str) -> Option<String> {
    output
        .lines()
        .filter_map(|line| image_id_pattern().captures(line))
        .last()
        .map(|captures| captures[1].to_string())
}
