// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CellfarmError, Result};

/// Largest accepted grid bound. Keeps the lattice (and the solver's own
/// tables) within a sane size.
pub const MAX_GRID_BOUND: u32 = 255;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::CellfarmError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_grid(cfg)?;
    validate_required_strings(cfg)?;
    validate_control(cfg)?;
    Ok(())
}

fn validate_grid(cfg: &RawConfigFile) -> Result<()> {
    for (key, value) in [("a_max", cfg.grid.a_max), ("b_max", cfg.grid.b_max)] {
        if value > MAX_GRID_BOUND {
            return Err(CellfarmError::ConfigError(format!(
                "[grid].{key} must be <= {MAX_GRID_BOUND} (got {value})"
            )));
        }
    }
    Ok(())
}

fn validate_required_strings(cfg: &RawConfigFile) -> Result<()> {
    let fields = [
        ("[store].root", cfg.store.root.as_os_str().is_empty()),
        ("[solver].program", cfg.solver.program.trim().is_empty()),
        ("[solver].subcommand", cfg.solver.subcommand.trim().is_empty()),
        ("[machines].file", cfg.machines.file.as_os_str().is_empty()),
        ("[control].stop_file", cfg.control.stop_file.as_os_str().is_empty()),
        ("[remote].ssh", cfg.remote.ssh.trim().is_empty()),
        ("[remote].scp", cfg.remote.scp.trim().is_empty()),
    ];

    if let Some((name, _)) = fields.iter().find(|(_, empty)| *empty) {
        return Err(CellfarmError::ConfigError(format!("{name} must not be empty")));
    }

    if cfg
        .solver
        .remote_program
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(CellfarmError::ConfigError(
            "[solver].remote_program must not be empty when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_control(cfg: &RawConfigFile) -> Result<()> {
    if cfg.control.poll_interval_ms == 0 {
        return Err(CellfarmError::ConfigError(
            "[control].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.control.max_attempts == 0 {
        return Err(CellfarmError::ConfigError(
            "[control].max_attempts must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).unwrap()
    }

    const MINIMAL: &str = r#"
[store]
root = "/cache"

[solver]
program = "solver"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = ConfigFile::try_from(raw(MINIMAL)).unwrap();
        assert_eq!((cfg.grid.a_max, cfg.grid.b_max), (6, 14));
        assert_eq!(cfg.solver.subcommand, "compute-strat-6x");
        assert_eq!(cfg.control.poll_interval_ms, 1000);
        assert_eq!(cfg.control.max_attempts, 3);
        assert_eq!(cfg.remote.options, vec!["-o", "BatchMode=yes"]);
        assert_eq!(cfg.remote_program(), "solver");
        assert_eq!(cfg.remote_root().to_str(), Some("/cache"));
        assert_eq!(cfg.machines.file.to_str(), Some("distributed/machines.txt"));
        assert_eq!(cfg.control.stop_file.to_str(), Some("distributed/stop"));
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let src = format!("{MINIMAL}\n[control]\npoll_interval_ms = 0\n");
        let err = ConfigFile::try_from(raw(&src)).unwrap_err();
        assert!(err.to_string().contains("poll_interval_ms"));
    }

    #[test]
    fn oversized_grid_is_rejected() {
        let src = format!("{MINIMAL}\n[grid]\na_max = 300\n");
        let err = ConfigFile::try_from(raw(&src)).unwrap_err();
        assert!(err.to_string().contains("a_max"));
    }

    #[test]
    fn blank_program_is_rejected() {
        let src = r#"
[store]
root = "/cache"

[solver]
program = "  "
"#;
        match ConfigFile::try_from(raw(src)) {
            Err(CellfarmError::ConfigError(msg)) => assert!(msg.contains("[solver].program")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }
}
