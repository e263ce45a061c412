mod common;

use common::init_test_logging;
use patho_common::config::ConfigSource;
use patho_common::{EnvParser, JobKind, PathoError, load_config};
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

fn config_file(raw: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(raw.as_bytes()).unwrap();
    file
}

#[test]
fn test_environment_wins_over_file() {
    init_test_logging();
    let file = config_file(
        r#"
        [evaluation]
        threshold = 30
        job = "upgrade"
        mask_tolerance_secs = 60
        "#,
    );
    let mut env = EnvParser::from_vars([("PATHO_THRESHOLD", "40")]);
    let loaded = load_config(Some(file.path()), &mut env).unwrap();
    info!(test = "test_environment_wins_over_file", sources = ?loaded.sources);

    let eval = &loaded.config.evaluation;
    assert_eq!(eval.threshold, 40);
    assert_eq!(eval.job, JobKind::Upgrade);
    assert_eq!(eval.mask_tolerance().num_seconds(), 60);
    assert_eq!(
        loaded.source_of("evaluation.threshold"),
        ConfigSource::Environment("PATHO_THRESHOLD".to_string())
    );
    assert_eq!(
        loaded.source_of("evaluation.job"),
        ConfigSource::File(file.path().to_path_buf())
    );
}

#[test]
fn test_tolerance_above_one_day_is_rejected() {
    init_test_logging();
    let file = config_file("[evaluation]\nmask_tolerance_secs = 90000\n");
    let err = load_config(Some(file.path()), &mut EnvParser::from_vars(Vec::<(String, String)>::new()))
        .unwrap_err();
    assert!(matches!(err, PathoError::ConfigInvalid(_)), "{err}");
}

#[test]
fn test_malformed_file_names_the_path() {
    init_test_logging();
    let file = config_file("[evaluation\nthreshold = ");
    let err = load_config(Some(file.path()), &mut EnvParser::from_vars(Vec::<(String, String)>::new()))
        .unwrap_err();
    assert!(matches!(err, PathoError::ConfigParse { .. }));
    assert!(err.to_string().contains(&file.path().display().to_string()), "{err}");
}

#[test]
fn test_missing_file_is_a_read_error() {
    init_test_logging();
    let err = load_config(
        Some(std::path::Path::new("/nonexistent/patho.toml")),
        &mut EnvParser::from_vars(Vec::<(String, String)>::new()),
    )
    .unwrap_err();
    assert!(matches!(err, PathoError::ConfigRead { .. }));
}

#[test]
fn test_only_keys_in_the_file_are_sourced_from_it() {
    init_test_logging();
    let file = config_file("[evaluation]\njob = \"upgrade\"\n");
    let loaded = load_config(Some(file.path()), &mut EnvParser::from_vars(Vec::<(String, String)>::new()))
        .unwrap();

    assert_eq!(loaded.config.evaluation.job, JobKind::Upgrade);
    assert_eq!(
        loaded.source_of("evaluation.job"),
        ConfigSource::File(file.path().to_path_buf())
    );
    assert_eq!(loaded.source_of("evaluation.threshold"), ConfigSource::Default);
    assert_eq!(loaded.source_of("logging.level"), ConfigSource::Default);
}
