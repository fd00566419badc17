use peoples_thread::config::{self, CliArgs};
use serial_test::serial;

const SECRET_VAR: &str = "PEOPLES_THREAD__AUTH__JWT_SECRET";
const PORT_VAR: &str = "PEOPLES_THREAD__SERVER__PORT";
const MONITOR_VAR: &str = "PEOPLES_THREAD__MONITOR__ENABLED";

fn set(key: &str, value: &str) {
    // SAFETY: every test touching the environment is `#[serial]`.
    unsafe { std::env::set_var(key, value) };
}

fn clear() {
    for key in [SECRET_VAR, PORT_VAR, MONITOR_VAR] {
        // SAFETY: as above.
        unsafe { std::env::remove_var(key) };
    }
}

fn load_from(file: &std::path::Path) -> Result<config::Settings, config::LoadError> {
    config::load(&CliArgs {
        config_file: Some(file.to_path_buf()),
        command: None,
    })
}

#[test]
#[serial]
fn environment_overrides_config_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("peoples.toml");
    std::fs::write(
        &file,
        "[auth]\njwt_secret = \"file-secret-0123456789abcdef012345\"\n\n[server]\nport = 4000\n",
    )
    .expect("write config");

    set(PORT_VAR, "4100");
    set(MONITOR_VAR, "true");
    let settings = load_from(&file);
    clear();

    let settings = settings.expect("settings");
    assert_eq!(settings.server.addr.port(), 4100);
    assert!(settings.monitor.enabled);
}

#[test]
#[serial]
fn secret_can_come_from_environment_only() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = dir.path().join("peoples.toml");
    std::fs::write(&file, "[server]\nport = 4200\n").expect("write config");

    let missing = load_from(&file);
    assert!(matches!(
        missing,
        Err(config::LoadError::Invalid {
            key: "auth.jwt_secret",
            ..
        })
    ));

    set(SECRET_VAR, "env-secret-0123456789abcdef0123456789");
    let settings = load_from(&file);
    clear();

    let settings = settings.expect("settings");
    assert_eq!(settings.server.addr.port(), 4200);
    assert_eq!(
        settings.auth.jwt_secret,
        "env-secret-0123456789abcdef0123456789"
    );
}
