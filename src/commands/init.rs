use crate::config::Settings;
use crate::template::{flattened_name, TemplateError, TemplateStore};
use clap::Args;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use tempfile::{NamedTempFile, TempDir, TempPath};
use thiserror::Error;

const STAGING_PREFIX: &str = "goon-init-";

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name of the new project
    #[arg(value_name = "PROGRAM_NAME")]
    pub program_name: String,
}

#[derive(Debug, Error)]
pub enum InitError {
    #[error("project name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// How the bootstrap script finished. A nonzero exit is not an error: the
/// script has already reported through the inherited streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ScriptFailed(i32),
}

impl Outcome {
    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            return Outcome::Success;
        }
        Outcome::ScriptFailed(exit_code(status))
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Success => 0,
            Outcome::ScriptFailed(code) => *code,
        }
    }
}

pub fn run(args: &InitArgs, settings: &Settings) -> Result<Outcome, Box<dyn std::error::Error>> {
    let initializer = Initializer::new(TemplateStore::embedded()?, settings);
    let outcome = initializer.initialize(&args.program_name)?;
    if let Outcome::ScriptFailed(code) = outcome {
        log::debug!("bootstrap script exited with {}", code);
    }
    Ok(outcome)
}

/// Stages the template and hands it to the bootstrap script.
pub struct Initializer<'a> {
    store: TemplateStore,
    settings: &'a Settings,
}

impl<'a> Initializer<'a> {
    pub fn new(store: TemplateStore, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    /// Temporary files are removed when this returns, on success and on
    /// error, unless `debug` is set.
    pub fn initialize(&self, project_name: &str) -> Result<Outcome, InitError> {
        self.initialize_with_env(project_name, std::env::vars_os())
    }

    fn initialize_with_env<I>(&self, project_name: &str, base_env: I) -> Result<Outcome, InitError>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        if project_name.trim().is_empty() {
            return Err(InitError::EmptyName);
        }

        let script = self.write_script()?;
        let staging = self.stage_templates()?;

        let invocation = self.invocation(
            script.path(),
            staging.path(),
            project_name,
            base_env,
        );
        invocation.run()
    }

    fn write_script(&self) -> Result<Scratch, InitError> {
        let script = self.store.bootstrap_script();
        let file = tempfile::Builder::new()
            .prefix(script.file_name())
            .tempfile()
            .map_err(io_error("failed creating script temp file"))?;
        let (mut handle, scratch) = Scratch::file(file, self.settings.debug)?;
        handle
            .write_all(&script.contents)
            .map_err(io_error("failed writing script temp file"))?;

        // Close the handle so the script can be executed.
        drop(handle);
        make_executable(scratch.path())?;
        Ok(scratch)
    }

    fn stage_templates(&self) -> Result<Scratch, InitError> {
        let dir = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir()
            .map_err(io_error("failed creating staging directory"))?;
        let staging = Scratch::dir(dir, self.settings.debug);

        for name in self.store.list_template_files() {
            copy_template_file(&self.store, name, staging.path())?;
        }
        Ok(staging)
    }

    fn invocation<I>(
        &self,
        script: &Path,
        staging: &Path,
        project_name: &str,
        base_env: I,
    ) -> ScriptInvocation
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let shell = self
            .settings
            .shell
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());

        let mut args: Vec<OsString> = Vec::new();
        let program = match shell {
            Some(shell) => {
                args.extend(
                    self.settings
                        .shell_args
                        .split_whitespace()
                        .map(OsString::from),
                );
                args.push(script.as_os_str().to_owned());
                OsString::from(shell)
            }
            None => {
                if !self.settings.shell_args.trim().is_empty() {
                    log::warn!("shell_args ignored: no shell configured");
                }
                script.as_os_str().to_owned()
            }
        };
        args.push(OsString::from(project_name));
        args.push(staging.as_os_str().to_owned());

        ScriptInvocation {
            program,
            args,
            env: build_environment(base_env, self.settings),
        }
    }
}

/// Fully resolved child process: nothing is looked up after construction.
#[derive(Debug)]
pub struct ScriptInvocation {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub env: BTreeMap<OsString, OsString>,
}

impl ScriptInvocation {
    fn run(&self) -> Result<Outcome, InitError> {
        log::debug!("command: {:?} {:?}", self.program, self.args);
        let status = Command::new(&self.program)
            .args(&self.args)
            .env_clear()
            .envs(&self.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|source| InitError::Spawn {
                program: self.program.to_string_lossy().into_owned(),
                source,
            })?;
        Ok(Outcome::from_status(status))
    }
}

/// Inherited environment, then configured overrides, then the DEBUG/VERBOSE markers.
pub fn build_environment<I>(base: I, settings: &Settings) -> BTreeMap<OsString, OsString>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut env: BTreeMap<OsString, OsString> = base.into_iter().collect();
    for (key, value) in &settings.env {
        env.insert(key.into(), value.into());
    }
    if settings.debug {
        env.insert("DEBUG".into(), "1".into());
    }
    if settings.verbose {
        env.insert("VERBOSE".into(), "1".into());
    }
    env
}

/// Temporary file or directory owned by one `init` run.
enum Scratch {
    File(TempPath),
    Dir(TempDir),
    Retained(PathBuf),
}

impl Scratch {
    /// Splits off the open handle. Under `debug` the file is kept from here
    /// on, so later write failures leave it in place too.
    fn file(file: NamedTempFile, debug: bool) -> Result<(fs::File, Self), InitError> {
        if !debug {
            let (handle, path) = file.into_parts();
            return Ok((handle, Scratch::File(path)));
        }
        let (handle, kept) = file.keep().map_err(|e| InitError::Io {
            context: "failed retaining script temp file".to_string(),
            source: e.error,
        })?;
        log::debug!("retaining script file {}", kept.display());
        Ok((handle, Scratch::Retained(kept)))
    }

    fn dir(dir: TempDir, debug: bool) -> Self {
        if !debug {
            return Scratch::Dir(dir);
        }
        let kept = dir.keep();
        log::debug!("retaining staging directory {}", kept.display());
        Scratch::Retained(kept)
    }

    fn path(&self) -> &Path {
        match self {
            Scratch::File(path) => &**path,
            Scratch::Dir(dir) => dir.path(),
            Scratch::Retained(path) => path.as_path(),
        }
    }
}

fn copy_template_file(store: &TemplateStore, name: &str, dir: &Path) -> Result<(), InitError> {
    let contents = store.read_file(name)?;
    let dest = dir.join(flattened_name(name));
    fs::write(&dest, contents).map_err(|source| InitError::Io {
        context: format!("failed copying {} to {}", name, dest.display()),
        source,
    })
}

fn io_error(context: &'static str) -> impl Fn(io::Error) -> InitError {
    move |source| InitError::Io {
        context: context.to_string(),
        source,
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), InitError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .map_err(io_error("failed marking script executable"))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), InitError> {
    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
