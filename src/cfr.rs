use anyhow::{Context, Result, bail};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// The external bytecode-to-source capability.
///
/// Implementations may write any number of files into `output_dir`, on
/// success or failure; callers must not assume the write is atomic.
pub trait Decompiler: Send + Sync {
    fn decompile(&self, input: &Path, output_dir: &Path) -> Result<()>;
}

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// A `cfr-decompiler` style wrapper executable.
    Native(PathBuf),
    /// `java -jar cfr.jar`.
    Jar { java: String, jar: PathBuf },
}

#[derive(Debug, Clone)]
pub struct Cfr {
    launcher: Launcher,
    timeout: Option<Duration>,
}

impl Cfr {
    pub fn new(cfr_jar: PathBuf) -> Self {
        let java = std::env::var("ARCHIVE_DECOMPILER_JAVA").unwrap_or_else(|_| "java".to_string());
        Self::with_java(java, cfr_jar)
    }

    pub fn with_java(java: impl Into<String>, cfr_jar: PathBuf) -> Self {
        Self {
            launcher: Launcher::Jar {
                java: java.into(),
                jar: cfr_jar,
            },
            timeout: None,
        }
    }

    pub fn native(executable: PathBuf) -> Self {
        Self {
            launcher: Launcher::Native(executable),
            timeout: None,
        }
    }

    /// Kills the decompiler process when a single call runs longer than
    /// `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    fn command(&self, input: &Path, output_dir: &Path) -> Command {
        let mut cmd = match &self.launcher {
            Launcher::Native(exe) => {
                let mut cmd = Command::new(exe);
                cmd.arg(input).arg("--outputdir").arg(output_dir);
                cmd
            }
            Launcher::Jar { java, jar } => {
                let mut cmd = java_command(java);
                cmd.arg("-jar")
                    .arg(jar)
                    .arg(input)
                    .arg("--outputdir")
                    .arg(output_dir)
                    .args(["--caseinsensitivefs", "true", "--silent", "true"]);
                cmd
            }
        };
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl Decompiler for Cfr {
    fn decompile(&self, input: &Path, output_dir: &Path) -> Result<()> {
        let mut child = self
            .command(input, output_dir)
            .spawn()
            .context("Failed to start CFR (ensure a JRE/JDK is installed)")?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.timeout {
            Some(limit) => wait_with_deadline(&mut child, limit)?,
            None => Some(child.wait().context("Failed to wait for CFR")?),
        };

        let mut output = join_output(stdout);
        output.push_str(&join_output(stderr));

        match status {
            None => bail!(
                "CFR timed out after {}s on {}",
                self.timeout.unwrap_or_default().as_secs_f64(),
                input.display()
            ),
            Some(status) if !status.success() => {
                bail!("CFR decompilation failed ({status}): {}", output.trim())
            }
            Some(_) => Ok(()),
        }
    }
}

fn java_command(java: &str) -> Command {
    #[cfg(windows)]
    {
        let lower = java.to_ascii_lowercase();
        if lower.ends_with(".cmd") || lower.ends_with(".bat") {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(java);
            return cmd;
        }
    }
    Command::new(java)
}

/// Returns `None` if the child had to be killed.
fn wait_with_deadline(
    child: &mut Child,
    limit: Duration,
) -> Result<Option<std::process::ExitStatus>> {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().context("Failed to poll CFR")? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join_output(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|buf| String::from_utf8_lossy(&buf).into_owned())
        .unwrap_or_default()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;

    fn write_script(path: &Path, body: &str) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, body)?;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        fs::set_permissions(path, perms)?;
        Ok(())
    }

    #[test]
    fn jar_launcher_passes_input_and_outputdir() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let fake_java = tmp.path().join("bin/java");
        write_script(
            &fake_java,
            r#"#!/bin/sh
set -e
[ "$1" = "-jar" ] || { echo "missing -jar" >&2; exit 2; }
[ "$4" = "--outputdir" ] || { echo "missing --outputdir" >&2; exit 2; }
mkdir -p "$5"
echo "public class Demo {}" > "$5/Demo.java"
"#,
        )?;

        let out = tmp.path().join("out");
        let cfr = Cfr::with_java(fake_java.to_string_lossy(), tmp.path().join("cfr.jar"));
        cfr.decompile(&tmp.path().join("Demo.class"), &out)?;
        assert!(fs::read_to_string(out.join("Demo.java"))?.contains("class Demo"));
        Ok(())
    }

    #[test]
    fn failure_carries_process_output() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let fake_java = tmp.path().join("bin/java");
        write_script(
            &fake_java,
            "#!/bin/sh\necho \"boom from fake cfr\" >&2\nexit 1\n",
        )?;

        let cfr = Cfr::with_java(fake_java.to_string_lossy(), tmp.path().join("cfr.jar"));
        let err = cfr
            .decompile(&tmp.path().join("A.class"), tmp.path())
            .unwrap_err()
            .to_string();
        assert!(err.contains("CFR decompilation failed"));
        assert!(err.contains("boom from fake cfr"));
        Ok(())
    }

    #[test]
    fn native_launcher_is_invoked_directly() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let exe = tmp.path().join("cfr-decompiler");
        write_script(
            &exe,
            "#!/bin/sh\n[ \"$2\" = \"--outputdir\" ] && mkdir -p \"$3\" && touch \"$3/ok\"\n",
        )?;

        let out = tmp.path().join("out");
        Cfr::native(exe).decompile(&tmp.path().join("A.class"), &out)?;
        assert!(out.join("ok").exists());
        Ok(())
    }

    #[test]
    fn hung_process_is_killed_after_timeout() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let fake_java = tmp.path().join("bin/java");
        write_script(&fake_java, "#!/bin/sh\nexec sleep 30\n")?;

        let cfr = Cfr::with_java(fake_java.to_string_lossy(), tmp.path().join("cfr.jar"))
            .with_timeout(Some(Duration::from_millis(200)));
        let started = Instant::now();
        let err = cfr
            .decompile(&tmp.path().join("A.class"), tmp.path())
            .unwrap_err()
            .to_string();
        assert!(err.contains("timed out"));
        assert!(started.elapsed() < Duration::from_secs(10));
        Ok(())
    }
}
