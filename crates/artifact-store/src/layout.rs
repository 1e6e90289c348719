use std::path::Path;

/// Used when the portal suggests no usable filename.
pub const DEFAULT_SUGGESTED_NAME: &str = "export.csv";

/// Final component of the suggested name, or the default when empty.
pub fn suggested_name(suggested: Option<&str>) -> String {
    suggested
        .map(|raw| raw.trim())
        // portals may send Windows-style paths as well
        .and_then(|raw| raw.rsplit(['/', '\\']).next())
        .and_then(|base| Path::new(base).file_name())
        .and_then(|base| base.to_str())
        .filter(|base| !base.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_SUGGESTED_NAME.to_string())
}

/// Stored name of an artifact: `{epoch}_{suggested}`.
pub fn artifact_file_name(epoch_seconds: i64, suggested: &str) -> String {
    format!("{epoch_seconds}_{suggested}")
}
