use clap::Args;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

/// Program name as used for config directories and environment variables.
pub const PROGRAM_NAME: &str = "goon_template";

const ENV_PREFIX: &str = "GOON_TEMPLATE_";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Options shared by every subcommand.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: first of ~/.goon_template, the user config dir, /etc/goon_template)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Produce debug output and keep temporary files
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Increase verbosity
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Bypass confirmation prompts
    #[arg(long, short = 'f', global = true)]
    pub force: bool,

    /// Log destination: a file path, `stdout` or `stderr`
    #[arg(long, short = 'l', global = true, value_name = "PATH")]
    pub logfile: Option<String>,

    /// Program used to run the bootstrap script (default: run it directly)
    #[arg(long, global = true, value_name = "PROGRAM")]
    pub shell: Option<String>,

    /// Arguments passed to the shell ahead of the script path
    #[arg(long, global = true, value_name = "ARGS", allow_hyphen_values = true)]
    pub shell_args: Option<String>,

    /// Extra environment variable for the bootstrap script (repeatable)
    #[arg(long = "env", global = true, value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub confirm_accept: Option<String>,
    pub confirm_reject: Option<String>,
}

/// Effective configuration, resolved once at startup and passed down explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub verbose: bool,
    pub force: bool,
    pub shell: Option<String>,
    pub shell_args: String,
    pub env: BTreeMap<String, String>,
    pub logfile: Option<String>,
    pub messages: Messages,

    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    goon_template: ProgramSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProgramSection {
    #[serde(default)]
    cli: Settings,
}

impl Settings {
    /// Layer defaults, config file, environment and command line, in that order.
    pub fn load(args: &GlobalArgs) -> Result<Self, Box<dyn Error>> {
        let config_file = match &args.config {
            Some(path) => {
                if !path.is_file() {
                    return Err(format!("config file {} not found", path.display()).into());
                }
                Some(path.clone())
            }
            None => find_config_file(&config_search_paths()),
        };

        let mut settings = match &config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        settings.config_file = config_file;

        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
        settings.apply_env(vars)?;
        settings.apply_args(args);
        settings.expand_paths();
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = fs::read_to_string(path)
            .map_err(|e| format!("failed reading config file {}: {}", path.display(), e))?;
        Self::from_yaml(&raw)
            .map_err(|e| format!("failed parsing config file {}: {}", path.display(), e).into())
    }

    fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let doc: ConfigDocument = serde_yaml::from_str(raw)?;
        Ok(doc.goon_template.cli)
    }

    /// Render as a config file document. `force` is never persisted.
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        let doc = ConfigDocument {
            goon_template: ProgramSection {
                cli: Settings {
                    force: false,
                    config_file: None,
                    ..self.clone()
                },
            },
        };
        serde_yaml::to_string(&doc)
    }

    /// Apply `GOON_TEMPLATE_*` variables. `GOON_TEMPLATE_ENV_<NAME>` adds `<NAME>`
    /// to the bootstrap script environment.
    pub fn apply_env<I>(&mut self, vars: I) -> Result<(), Box<dyn Error>>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "DEBUG" => self.debug = parse_bool(&key, &value)?,
                "VERBOSE" => self.verbose = parse_bool(&key, &value)?,
                "FORCE" => self.force = parse_bool(&key, &value)?,
                "SHELL" => self.shell = Some(value),
                "SHELL_ARGS" => self.shell_args = value,
                "LOGFILE" => self.logfile = Some(value),
                "MESSAGES_CONFIRM_ACCEPT" => self.messages.confirm_accept = Some(value),
                "MESSAGES_CONFIRM_REJECT" => self.messages.confirm_reject = Some(value),
                _ => {
                    if let Some(var) = name.strip_prefix("ENV_").filter(|v| !v.is_empty()) {
                        self.env.insert(var.to_string(), value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Flags only ever switch booleans on; absent flags leave lower layers alone.
    pub fn apply_args(&mut self, args: &GlobalArgs) {
        self.debug |= args.debug;
        self.verbose |= args.verbose;
        self.force |= args.force;
        if let Some(logfile) = &args.logfile {
            self.logfile = Some(logfile.clone());
        }
        if let Some(shell) = &args.shell {
            self.shell = Some(shell.clone());
        }
        if let Some(shell_args) = &args.shell_args {
            self.shell_args = shell_args.clone();
        }
        for (key, value) in &args.env {
            self.env.insert(key.clone(), value.clone());
        }
    }

    fn expand_paths(&mut self) {
        self.shell = self.shell.as_deref().map(expand_path);
        self.logfile = self.logfile.as_deref().map(expand_path);
    }
}

/// Expand a leading `~` and `$VAR` references.
pub fn expand_path(path: &str) -> String {
    match shellexpand::full(path) {
        Ok(expanded) => expanded.into_owned(),
        Err(_) => shellexpand::tilde(path).into_owned(),
    }
}

pub fn format_json<T: Serialize>(value: &T) -> Result<String, Box<dyn Error>> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Where `config --write` puts the file when no path is given.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(PROGRAM_NAME).join(CONFIG_FILE_NAME))
}

fn config_search_paths() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join(format!(".{}", PROGRAM_NAME)));
    }
    if let Some(config) = dirs::config_dir() {
        roots.push(config.join(PROGRAM_NAME));
    }
    roots.push(Path::new("/etc").join(PROGRAM_NAME));
    roots
        .into_iter()
        .map(|root| root.join(CONFIG_FILE_NAME))
        .collect()
}

fn find_config_file(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

fn parse_bool(key: &str, value: &str) -> Result<bool, Box<dyn Error>> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("invalid boolean for {}: '{}'", key, other).into()),
    }
}

fn parse_env_pair(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}
