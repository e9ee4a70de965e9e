use clap::{ArgAction, Parser};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "archive-decompiler", version)]
#[command(about = "Batch-decompile Java JAR/WAR archives, class directories and class files with CFR")]
pub struct Cli {
    /// JAR, WAR, class file or directory. Defaults to the current directory
    /// when it is an exploded web deployment.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output root. Defaults to `src` next to a file input or inside a
    /// directory input.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Concurrent decompile workers (defaults to the logical core count).
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Only decompile these packages, comma separated (`com.example,org.demo`).
    #[arg(short = 'i', long = "include", value_name = "PACKAGES")]
    pub include: Option<String>,

    /// Additional packages to exclude, comma separated.
    #[arg(short = 'e', long = "exclude", value_name = "PACKAGES")]
    pub exclude: Option<String>,

    /// Skip dependency jars under BOOT-INF/lib and WEB-INF/lib.
    #[arg(long, value_name = "BOOL", default_value_t = true, action = ArgAction::Set)]
    pub skip_libs: bool,

    /// Do not apply the built-in framework package exclusions.
    #[arg(long)]
    pub no_default_exclude: bool,

    /// Decompile library jars whose file name contains one of these
    /// keywords, comma separated.
    #[arg(short = 'j', long = "jar-include", value_name = "KEYWORDS")]
    pub jar_include: Option<String>,

    /// Copy configuration resources into `<output>/resources`.
    #[arg(short = 'r', long)]
    pub copy_resources: bool,

    /// Path to cfr.jar.
    #[arg(long, value_name = "FILE")]
    pub cfr: Option<PathBuf>,

    /// Kill a single decompile call after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// More log output (-v debug, -vv trace).
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// No log output and no progress line.
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["archive-decompiler"]);
        assert!(cli.input.is_none());
        assert!(cli.skip_libs);
        assert!(!cli.no_default_exclude);
        assert!(!cli.copy_resources);
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn full_surface() {
        let cli = Cli::parse_from([
            "archive-decompiler",
            "app.war",
            "-o",
            "out",
            "-w",
            "3",
            "-i",
            "com.app",
            "-e",
            "com.vendor",
            "--skip-libs",
            "false",
            "--no-default-exclude",
            "-j",
            "core,common",
            "-r",
            "--timeout",
            "30",
            "-vv",
        ]);
        assert_eq!(cli.input, Some(PathBuf::from("app.war")));
        assert_eq!(cli.output, Some(PathBuf::from("out")));
        assert_eq!(cli.workers, Some(3));
        assert_eq!(cli.include.as_deref(), Some("com.app"));
        assert_eq!(cli.exclude.as_deref(), Some("com.vendor"));
        assert!(!cli.skip_libs);
        assert!(cli.no_default_exclude);
        assert_eq!(cli.jar_include.as_deref(), Some("core,common"));
        assert!(cli.copy_resources);
        assert_eq!(cli.timeout, Some(30));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["archive-decompiler", "-q", "-v"]).is_err());
    }
}
