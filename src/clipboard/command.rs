use std::io::{ErrorKind, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use super::{non_empty, ClipboardError, ClipboardService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipCommand {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

const PBPASTE: ClipCommand = ClipCommand { program: "pbpaste", args: &[] };
const PBCOPY: ClipCommand = ClipCommand { program: "pbcopy", args: &[] };
const XCLIP_OUT: ClipCommand = ClipCommand {
    program: "xclip",
    args: &["-selection", "clipboard", "-o"],
};
const XCLIP_IN: ClipCommand = ClipCommand {
    program: "xclip",
    args: &["-selection", "clipboard"],
};
const XSEL_OUT: ClipCommand = ClipCommand {
    program: "xsel",
    args: &["--clipboard", "--output"],
};
const XSEL_IN: ClipCommand = ClipCommand {
    program: "xsel",
    args: &["--clipboard", "--input"],
};
const PS_GET: ClipCommand = ClipCommand {
    program: "powershell",
    args: &["-NoProfile", "-Command", "Get-Clipboard"],
};
const PS_SET: ClipCommand = ClipCommand {
    program: "powershell",
    args: &["-NoProfile", "-Command", "Set-Clipboard -Value $input"],
};

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
const WAIT_STEP: Duration = Duration::from_millis(10);

/// Shells out to the platform clipboard tools. A tool that outlives the
/// timeout is killed and reported as a failure.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    readers: Vec<ClipCommand>,
    writers: Vec<ClipCommand>,
    trim_crlf: bool,
    timeout: Duration,
}

impl CommandClipboard {
    pub fn new(readers: Vec<ClipCommand>, writers: Vec<ClipCommand>) -> Self {
        Self {
            readers,
            writers,
            trim_crlf: false,
            timeout: COMMAND_TIMEOUT,
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn for_platform() -> Self {
        if cfg!(target_os = "macos") {
            Self::new(vec![PBPASTE], vec![PBCOPY])
        } else if cfg!(target_os = "windows") {
            // Get-Clipboard appends a line break to whatever it prints.
            Self {
                trim_crlf: true,
                ..Self::new(vec![PS_GET], vec![PS_SET])
            }
        } else {
            Self::new(vec![XCLIP_OUT, XSEL_OUT], vec![XCLIP_IN, XSEL_IN])
        }
    }

    fn run_reader(&self, cmd: ClipCommand) -> Result<String, ClipboardError> {
        let mut child = Command::new(cmd.program)
            .args(cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let Some(mut stdout) = child.stdout.take() else {
            reap(&mut child);
            return Err(ClipboardError::Command(format!(
                "failed to open {} stdout",
                cmd.program
            )));
        };
        let drain = thread::spawn(move || {
            let mut buf = Vec::new();
            stdout.read_to_end(&mut buf).map(|_| buf)
        });

        let status = wait_with_deadline(&mut child, cmd.program, self.timeout)?;
        let stdout = drain
            .join()
            .map_err(|_| ClipboardError::Command(format!("{} reader panicked", cmd.program)))??;
        if !status.success() {
            return Err(ClipboardError::Command(format!(
                "{} exited unsuccessfully",
                cmd.program
            )));
        }

        let mut text = String::from_utf8_lossy(&stdout).to_string();
        if self.trim_crlf {
            let trimmed = text.trim_end_matches(['\r', '\n']).len();
            text.truncate(trimmed);
        }
        Ok(text)
    }

    fn run_writer(&self, cmd: ClipCommand, content: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(cmd.program)
            .args(cmd.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let Some(mut stdin) = child.stdin.take() else {
            reap(&mut child);
            return Err(ClipboardError::Command(format!(
                "failed to open {} stdin",
                cmd.program
            )));
        };
        // A tool that never reads would block write_all forever once the pipe fills.
        let input = content.as_bytes().to_vec();
        let feed = thread::spawn(move || stdin.write_all(&input));

        let status = wait_with_deadline(&mut child, cmd.program, self.timeout)?;
        feed.join()
            .map_err(|_| ClipboardError::Command(format!("{} writer panicked", cmd.program)))??;
        if !status.success() {
            return Err(ClipboardError::Command(format!(
                "{} exited unsuccessfully",
                cmd.program
            )));
        }

        Ok(())
    }
}

/// Polls the child until it exits or `timeout` elapses. On expiry the child
/// is killed and reaped; any pipe threads end once its handles close.
fn wait_with_deadline(
    child: &mut Child,
    program: &str,
    timeout: Duration,
) -> Result<ExitStatus, ClipboardError> {
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(err) => {
                reap(child);
                return Err(err.into());
            }
        }
        if Instant::now() >= deadline {
            reap(child);
            return Err(ClipboardError::Command(format!(
                "{program} timed out after {}ms",
                timeout.as_millis()
            )));
        }
        thread::sleep(WAIT_STEP);
    }
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

impl ClipboardService for CommandClipboard {
    fn name(&self) -> &'static str {
        "command"
    }

    fn read_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut last_err = ClipboardError::Unavailable;
        for cmd in &self.readers {
            match self.run_reader(*cmd) {
                Ok(text) => return Ok(non_empty(text)),
                Err(ClipboardError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                    last_err = ClipboardError::Command(format!("{} not installed", cmd.program));
                }
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }

    fn write_text(&self, content: &str) -> Result<(), ClipboardError> {
        let mut last_err = ClipboardError::Unavailable;
        for cmd in &self.writers {
            match self.run_writer(*cmd, content) {
                Ok(()) => return Ok(()),
                Err(ClipboardError::Io(err)) if err.kind() == ErrorKind::NotFound => {
                    last_err = ClipboardError::Command(format!("{} not installed", cmd.program));
                }
                Err(err) => last_err = err,
            }
        }
        Err(last_err)
    }
}
