use crate::config::{default_config_path, format_json, Settings};
use crate::prompt;
use clap::Args;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub struct ConfigArgs {
    /// Save the effective settings as a YAML config file (default: the user config dir)
    #[arg(long, value_name = "FILE")]
    pub write: Option<Option<PathBuf>>,
}

/// Print the effective settings after every layer has been applied.
pub fn run(args: &ConfigArgs, settings: &Settings) -> Result<(), Box<dyn Error>> {
    match &settings.config_file {
        Some(path) => log::debug!("Using config file: {}", path.display()),
        None => log::debug!("No config file found"),
    }

    match &args.write {
        Some(target) => {
            let path = match target {
                Some(path) => path.clone(),
                None => default_config_path().ok_or("no user config directory; pass --write FILE")?,
            };
            write_config(&path, settings)?;
            Ok(())
        }
        None => {
            println!("{}", format_json(settings)?);
            Ok(())
        }
    }
}

/// Returns whether the file was written; an existing file needs confirmation.
fn write_config(path: &Path, settings: &Settings) -> Result<bool, Box<dyn Error>> {
    if path.exists()
        && !prompt::confirm(settings, &format!("{} already exists; overwrite?", path.display()))?
    {
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| format!("failed creating {}: {}", parent.display(), e))?;
    }
    fs::write(path, settings.to_yaml()?)
        .map_err(|e| format!("failed writing config file {}: {}", path.display(), e))?;
    log::info!("Wrote config file {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[test]
    fn settings_render_as_json() {
        let settings = Settings {
            verbose: true,
            shell: Some("/bin/sh".to_string()),
            env: BTreeMap::from([("GOFLAGS".to_string(), "-mod=mod".to_string())]),
            config_file: Some(PathBuf::from("/etc/goon_template/config.yaml")),
            ..Settings::default()
        };
        let json: serde_json::Value = serde_json::from_str(&format_json(&settings).unwrap()).unwrap();
        assert_eq!(json["verbose"], true);
        assert_eq!(json["shell"], "/bin/sh");
        assert_eq!(json["env"]["GOFLAGS"], "-mod=mod");
        assert_eq!(json["config_file"], "/etc/goon_template/config.yaml");
        assert_eq!(json["messages"]["confirm_accept"], serde_json::Value::Null);
    }

    #[test]
    fn write_creates_parent_dirs_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("goon_template/config.yaml");
        let settings = Settings {
            shell: Some("/bin/sh".to_string()),
            shell_args: "-e".to_string(),
            ..Settings::default()
        };

        assert!(write_config(&path, &settings).unwrap());
        assert_eq!(Settings::from_file(&path).unwrap(), settings);
    }

    #[test]
    fn forced_write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        fs::write(&path, "goon_template:\n  cli:\n    debug: true\n").unwrap();
        let settings = Settings {
            force: true,
            verbose: true,
            ..Settings::default()
        };

        assert!(write_config(&path, &settings).unwrap());
        let written = Settings::from_file(&path).unwrap();
        assert!(written.verbose);
        assert!(!written.debug);
        assert!(!written.force);
    }
}
