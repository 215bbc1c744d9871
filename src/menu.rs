use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Candidate lines offered for a single choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prompt {
    pub lines: Vec<String>,
    /// Row to highlight when the menu opens, as `-selected-row` counts it.
    pub selected_row: Option<usize>,
}

impl Prompt {
    pub fn new(lines: Vec<String>) -> Self {
        Self {
            lines,
            selected_row: None,
        }
    }

    pub fn with_selected_row(mut self, row: usize) -> Self {
        self.selected_row = Some(row);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MenuError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("menu i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("{program} did not answer within {timeout:?}")]
    TimedOut { program: String, timeout: Duration },
    #[error("menu dismissed")]
    Dismissed,
    #[error("{program} exited with {status}")]
    Failed { program: String, status: ExitStatus },
}

pub trait Menu {
    /// Blocks until the user picks or types a line.
    fn choose(&self, prompt: &Prompt) -> Result<String, MenuError>;

    fn message(&self, text: &str) -> Result<(), MenuError>;
}

/// Drives rofi (or anything accepting its `-dmenu` and `-e` flags).
#[derive(Debug, Clone)]
pub struct Rofi {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl Rofi {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            extra_args,
            timeout,
        }
    }

    fn run(&self, args: &[String], input: Option<String>) -> Result<String, MenuError> {
        debug!(program = %self.program, ?args, "running menu");
        let mut child = Command::new(&self.program)
            .args(&self.extra_args)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| MenuError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        // Pipes are serviced off-thread so a full buffer never stalls the deadline.
        let writer = match (child.stdin.take(), input) {
            (Some(mut stdin), Some(input)) => Some(thread::spawn(move || {
                let result = stdin.write_all(input.as_bytes());
                match result {
                    Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                    other => other,
                }
            })),
            _ => None,
        };
        let reader = child.stdout.take().map(|mut stdout| {
            thread::spawn(move || {
                let mut output = Vec::new();
                stdout
                    .read_to_end(&mut output)
                    .map(|_| String::from_utf8_lossy(&output).into_owned())
            })
        });

        let status = self.wait(&mut child)?;

        if let Some(writer) = writer {
            writer
                .join()
                .map_err(|_| io::Error::other("menu input writer panicked"))??;
        }
        let output = match reader {
            Some(reader) => reader
                .join()
                .map_err(|_| io::Error::other("menu output reader panicked"))??,
            None => String::new(),
        };

        if status.success() {
            return Ok(output.trim_end_matches(['\n', '\r']).to_string());
        }
        if status.code() == Some(1) {
            return Err(MenuError::Dismissed);
        }
        Err(MenuError::Failed {
            program: self.program.clone(),
            status,
        })
    }

    fn wait(&self, child: &mut Child) -> Result<ExitStatus, MenuError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(MenuError::TimedOut {
                    program: self.program.clone(),
                    timeout: self.timeout,
                });
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Menu for Rofi {
    fn choose(&self, prompt: &Prompt) -> Result<String, MenuError> {
        let mut args = vec!["-dmenu".to_string()];
        if let Some(row) = prompt.selected_row {
            args.push("-selected-row".to_string());
            args.push(row.to_string());
        }
        self.run(&args, Some(prompt.lines.join("\n")))
    }

    fn message(&self, text: &str) -> Result<(), MenuError> {
        self.run(&["-e".to_string(), text.to_string()], None)
            .map(|_| ())
    }
}
