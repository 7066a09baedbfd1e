// Utility helpers

use chrono::Utc;

/// Millisecond timestamp plus a random suffix, unique enough for run and file ids.
pub fn new_id() -> String {
    format!(
        "{}-{:08x}",
        Utc::now().timestamp_millis(),
        rand::random::<u32>()
    )
}

/// `{prefix}_YYYY-MM-DDTHH-MM-SS.txt`
pub fn timestamped_file_name(prefix: &str) -> String {
    format!("{}_{}.txt", prefix, Utc::now().format("%Y-%m-%dT%H-%M-%S"))
}
