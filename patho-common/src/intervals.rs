//! Reading recorded intervals from disk.

use crate::errors::{PathoError, Result};
use crate::model::EventRecord;
use std::path::Path;
use tracing::debug;

/// Load a JSON array of event records.
pub fn read_intervals(path: &Path) -> Result<Vec<EventRecord>> {
    let raw = std::fs::read_to_string(path).map_err(|source| PathoError::IntervalsRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<EventRecord> =
        serde_json::from_str(&raw).map_err(|source| PathoError::IntervalsParse {
            path: path.to_path_buf(),
            source,
        })?;
    debug!(path = %path.display(), records = records.len(), "intervals loaded");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_array_of_records() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"source":"KubeEvent","locator":{{"keys":{{"namespace":"openshift"}}}},"message":{{"reason":"R","annotations":{{"count":"22"}}}},"from":"1997-08-29T04:00:00Z","to":"1997-08-29T04:00:00Z"}}]"#
        )
        .unwrap();
        let records = read_intervals(file.path()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].namespace(), Some("openshift"));
    }

    #[test]
    fn errors_name_the_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"not\": \"an array\"}}").unwrap();
        let err = read_intervals(file.path()).unwrap_err();
        assert!(matches!(err, PathoError::IntervalsParse { .. }));

        let err = read_intervals(Path::new("/nonexistent/intervals.json")).unwrap_err();
        assert!(matches!(err, PathoError::IntervalsRead { .. }));
    }
}
