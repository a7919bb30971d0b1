//! Integration tests for logging functionality

use shelfpack::config::{load_config_str, LoggingConfig};
use shelfpack::domain::{ChildKind, JobId, JobStatus, SocialSection, TaskHandle};
use shelfpack::logging::init_logging;
use tempfile::TempDir;

#[test]
fn test_logging_config_default() {
    let config = LoggingConfig::default();
    assert!(config.local_enabled);
    assert_eq!(config.local_rotation, "daily");
    assert!(config.local_max_size_mb > 0);
}

// The global subscriber can only be installed once per process, so this is
// the only test here that initializes it.
#[test]
fn test_init_logging_creates_log_directory() {
    let temp_dir = TempDir::new().unwrap();
    let log_path = temp_dir.path().join("logs");

    let config = LoggingConfig {
        local_enabled: true,
        local_path: log_path.to_string_lossy().to_string(),
        local_rotation: "daily".to_string(),
        local_max_size_mb: 100,
    };
    assert!(!log_path.exists());

    let guard = init_logging("debug", &config).expect("logging should initialize");
    assert!(log_path.is_dir());

    // Macros expand against the installed subscriber
    let job_id = JobId::new();
    let kind = ChildKind::SocialGraph {
        section: SocialSection::Goals,
    };
    shelfpack::log_job_transition!(job_id, JobStatus::Active);
    shelfpack::log_job_transition!(job_id, JobStatus::Complete, kind.tag());
    shelfpack::log_task_dispatched!("run_child", "imports", TaskHandle::generate());
    shelfpack::log_retry_attempt!(1, 3, "503 from catalog");
    shelfpack::log_error_with_context!("boom", "build_archive");

    drop(guard);
}

#[test]
fn test_logging_rotation_types() {
    for rotation in ["daily", "size"] {
        let toml = format!(
            "[catalog]\nbase_url = \"https://b.example\"\nauth_type = \"none\"\n\
             [logging]\nlocal_enabled = false\nlocal_rotation = \"{rotation}\"\n"
        );
        let config = load_config_str(&toml).unwrap();
        assert_eq!(config.logging.local_rotation, rotation);
    }
}

#[test]
fn test_invalid_rotation_is_rejected() {
    let toml = "[catalog]\nbase_url = \"https://b.example\"\nauth_type = \"none\"\n\
                [logging]\nlocal_rotation = \"hourly\"\n";
    let err = load_config_str(toml).unwrap_err();
    assert!(err.to_string().contains("local_rotation"));
}
