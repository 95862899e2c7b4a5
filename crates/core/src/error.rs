/// Failure to turn diagnostic command output into metric samples.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryParseError {
    #[error("line {line}: expected {expected} fields, got {found}")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: field `{field}` is not numeric: {value:?}")]
    NotNumeric {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("no GPU rows in command output")]
    Empty,
}
