//! Delimited headers and formatting helpers for listing commands.

/// Columns printed by `project list`.
pub(crate) const PROJECT_HEADER: [&str; 6] = [
    "ID",
    "Name",
    "Insert Date",
    "Subject Count",
    "Experiment Count",
    "PI",
];

/// Columns printed by `subject list`.
pub(crate) const SUBJECT_HEADER: [&str; 4] = ["Project ID", "Subject ID", "Label", "Insert Date"];

/// Columns printed by `session list`.
pub(crate) const SESSION_HEADER: [&str; 6] = [
    "Project ID",
    "Session ID",
    "Session Label",
    "Insert Date",
    "Modality",
    "Scan Count",
];

/// Columns printed by `session list --brief`.
pub(crate) const SESSION_HEADER_BRIEF: [&str; 3] = ["Project ID", "Session ID", "Session Label"];

/// Join fields with the configured delimiter.
pub(crate) fn join_fields<S: AsRef<str>>(fields: &[S], delimiter: char) -> String {
    fields
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&delimiter.to_string())
}

/// Render a count that may have failed to resolve.
pub(crate) fn count_or_unknown(count: Option<usize>) -> String {
    count.map_or_else(|| "Unknown".to_string(), |value| value.to_string())
}
