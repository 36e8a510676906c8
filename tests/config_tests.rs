use std::fs;
use std::path::PathBuf;

use alloy_primitives::address;
use tempfile::TempDir;
use vaultsmith::config::Config;
use vaultsmith::domain::DEFAULT_GAS_CEILING;
use vaultsmith::error::{ConfigError, Error};

fn write_temp_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn config_loads_full_file() {
    let toml = r#"
[network]
rpc_url = "https://eth.example.org"
chain_id = 1
registry = "0xd6b7e3ba4bcd6f4bd45c0bf1e5b9b32b77e5e5d0"

[logging]
level = "debug"
format = "json"

[recipe]
gas_ceiling = 4000000

[monitor]
staleness_hours = 6
price_tolerance_bps = 50
concurrency = 4
feed_registry = "0x47fb2585d2c56fe188d0e6ec628a38b74fceeedf"
"#;

    let dir = TempDir::new().unwrap();
    let path = write_temp_config(&dir, toml);
    let config = Config::load(&path).unwrap();

    assert_eq!(
        config.network.registry,
        Some(address!("d6b7e3ba4bcd6f4bd45c0bf1e5b9b32b77e5e5d0"))
    );
    assert_eq!(config.logging.format, "json");
    assert_eq!(config.recipe.gas_ceiling, 4_000_000);

    let settings = config.monitor.settings();
    assert_eq!(settings.staleness.as_secs(), 6 * 60 * 60);
    assert_eq!(settings.price_tolerance_bps, 50);
    assert_eq!(settings.concurrency, 4);
    assert!(config.monitor.feed_registry.is_some());
}

#[test]
fn config_fills_defaults() {
    let config = Config::parse(
        r#"
[network]
rpc_url = "http://localhost:8545"
"#,
    )
    .unwrap();

    assert_eq!(config.network.chain_id, 1);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, "pretty");
    assert_eq!(config.recipe.gas_ceiling, DEFAULT_GAS_CEILING);
    assert_eq!(config.monitor.staleness_hours, 24);
    assert_eq!(config.monitor.price_tolerance_bps, 100);
    assert!(config.monitor.feed_registry.is_none());
}

#[test]
fn config_rejects_tiny_gas_ceiling() {
    let toml = r#"
[network]
rpc_url = "http://localhost:8545"

[recipe]
gas_ceiling = 1000
"#;

    match Config::parse(toml) {
        Err(Error::Config(ConfigError::InvalidValue {
            field: "gas_ceiling",
            ..
        })) => {}
        Err(err) => panic!("Expected invalid gas ceiling error, got {err}"),
        Ok(_) => panic!("Expected invalid gas ceiling error, got Ok"),
    }
}

#[test]
fn config_rejects_unknown_log_format() {
    let toml = r#"
[network]
rpc_url = "http://localhost:8545"

[logging]
format = "xml"
"#;

    assert!(matches!(
        Config::parse(toml),
        Err(Error::Config(ConfigError::InvalidValue { field: "format", .. }))
    ));
}

#[test]
fn config_requires_network_section() {
    assert!(matches!(
        Config::parse("[logging]\nlevel = \"info\"\n"),
        Err(Error::Config(ConfigError::Parse(_)))
    ));
}

#[test]
fn config_load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let result = Config::load(dir.path().join("absent.toml"));
    assert!(matches!(result, Err(Error::Config(ConfigError::ReadFile(_)))));
}
