use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cfr::Cfr;
use crate::cli::Cli;
use crate::filter::{DEFAULT_EXCLUDES, FilterConfig, parse_keywords, parse_package_prefixes};
use crate::pipeline::RunConfig;
use crate::report::ProgressMode;

const CFR_URL: &str = "https://github.com/leibnitz27/cfr/releases/download/0.152/cfr-0.152.jar";
const NATIVE_CFR: &str = "cfr-decompiler";

pub fn run_config(cli: &Cli) -> Result<RunConfig> {
    let cwd = env::current_dir().context("Failed to read current directory")?;
    let input = resolve_input(cli.input.as_deref(), &cwd)?;
    let output = match &cli.output {
        Some(p) => std::path::absolute(p)
            .with_context(|| format!("Invalid output path: {}", p.display()))?,
        None => default_output(&input),
    };

    Ok(RunConfig {
        input,
        output,
        workers: cli.workers.unwrap_or_else(num_cpus::get).max(1),
        filter: build_filter(cli),
        copy_resources: cli.copy_resources,
        progress: if cli.quiet {
            ProgressMode::Silent
        } else {
            ProgressMode::console()
        },
        scratch_root: None,
    })
}

/// Without an explicit input the working directory is used, but only when it
/// looks like an exploded web application.
pub fn resolve_input(input: Option<&Path>, cwd: &Path) -> Result<PathBuf> {
    match input {
        Some(p) if p.is_absolute() => Ok(p.to_path_buf()),
        Some(p) => Ok(cwd.join(p)),
        None if is_deploy_dir(cwd) => Ok(cwd.to_path_buf()),
        None => anyhow::bail!(
            "No input given and {} is not a web deployment (no WEB-INF/classes or WEB-INF/lib)",
            cwd.display()
        ),
    }
}

pub fn is_deploy_dir(dir: &Path) -> bool {
    dir.join("WEB-INF/classes").is_dir() || dir.join("WEB-INF/lib").is_dir()
}

/// `<parent>/src` for a file input, `<input>/src` for a directory.
pub fn default_output(input: &Path) -> PathBuf {
    if input.is_dir() {
        return input.join("src");
    }
    match input.parent() {
        Some(parent) => parent.join("src"),
        None => PathBuf::from("src"),
    }
}

pub fn build_filter(cli: &Cli) -> FilterConfig {
    let mut filter = if cli.no_default_exclude {
        FilterConfig::with_excludes(&[])
    } else {
        FilterConfig::with_excludes(DEFAULT_EXCLUDES)
    };

    if let Some(include) = &cli.include {
        filter.includes = parse_package_prefixes(include);
    }
    if let Some(exclude) = &cli.exclude {
        filter.excludes.extend(parse_package_prefixes(exclude));
    }
    if let Some(keywords) = &cli.jar_include {
        filter.jar_include_keywords = parse_keywords(keywords);
    }
    filter.skip_libs = cli.skip_libs;
    filter
}

pub fn resolve_decompiler(cli: &Cli) -> Result<Cfr> {
    let timeout = cli.timeout.filter(|s| *s > 0).map(Duration::from_secs);

    if let Some(p) = cli.cfr.clone() {
        return Ok(Cfr::new(p).with_timeout(timeout));
    }

    if let Ok(p) = env::var("CFR_JAR") {
        return Ok(Cfr::new(PathBuf::from(p)).with_timeout(timeout));
    }

    if let Ok(exe) = which::which(NATIVE_CFR) {
        tracing::debug!("using {}", exe.display());
        return Ok(Cfr::native(exe).with_timeout(timeout));
    }

    let default_path = tool_home()?.join("tools").join("cfr.jar");
    install_cfr_if_missing(&default_path)?;
    Ok(Cfr::new(default_path).with_timeout(timeout))
}

fn tool_home() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Failed to resolve home directory"))?;
    Ok(home.join(".archive-decompiler"))
}

/// Fetches CFR into `target` unless it is already cached there. The jar is
/// downloaded to a sibling `.part` file and renamed, so an interrupted
/// download never leaves a truncated `cfr.jar` behind.
fn install_cfr_if_missing(target: &Path) -> Result<()> {
    if target.is_file() {
        return Ok(());
    }

    let tools_dir = target
        .parent()
        .context("CFR cache path has no parent directory")?;
    std::fs::create_dir_all(tools_dir)
        .with_context(|| format!("Cannot create CFR cache directory {}", tools_dir.display()))?;

    let partial = target.with_extension("jar.part");
    tracing::info!("no CFR found, fetching {CFR_URL}");
    if let Err(err) = download(CFR_URL, &partial) {
        let _ = std::fs::remove_file(&partial);
        return Err(err.context("CFR is not installed; pass --cfr or set CFR_JAR"));
    }

    std::fs::rename(&partial, target)
        .with_context(|| format!("Cannot move downloaded CFR to {}", target.display()))?;
    tracing::info!("CFR cached at {}", target.display());
    Ok(())
}

fn download(url: &str, dest: &Path) -> Result<()> {
    let curl = std::process::Command::new("curl")
        .args(["-L", "--fail", "--silent", "--show-error", "-o"])
        .arg(dest)
        .arg(url)
        .status();

    match curl {
        Ok(status) if status.success() => return Ok(()),
        Ok(status) => tracing::warn!("curl exited with {status}"),
        Err(err) => tracing::warn!("curl unavailable: {err}"),
    }

    if cfg!(windows) {
        let status = std::process::Command::new("powershell")
            .args(["-NoProfile", "-ExecutionPolicy", "Bypass", "-Command"])
            .arg(format!(
                "Invoke-WebRequest -Uri '{url}' -OutFile '{}'",
                dest.display()
            ))
            .status()
            .context("Cannot run powershell")?;
        if status.success() {
            return Ok(());
        }
    }

    anyhow::bail!("download of {url} failed")
}
