use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;

use super::{prompt, Error, Result};

/// The line that asks a well-behaved candidate to shut down.
pub const QUIT_COMMAND: &str = "q";

const READ_CHUNK_SIZE: usize = 4096;

/// An optional sink receiving every raw byte read from the candidate's
/// terminal, in arrival order. Injected so tests can capture the session
/// without global state.
pub type ByteSink = Box<dyn Write + Send>;

/// Owns one live candidate process behind a pseudo-terminal and mediates
/// all communication in half-duplex turns: write one command line, then
/// block (bounded) until the prompt ends the turn.
///
/// A background thread drains the PTY into a channel; `await_prompt` is an
/// incremental scan of the accumulated text against the prompt grammar.
pub struct ProcessDriver {
    child: Box<dyn Child + Send + Sync>,
    writer: ByteSink,
    rx: mpsc::UnboundedReceiver<Vec<u8>>,
    buf: String,
    // Keeps the master side of the PTY open for the reader thread.
    _master: Box<dyn MasterPty + Send>,
}

impl ProcessDriver {
    /// Spawns `program` attached to a fresh pseudo-terminal, with terminal
    /// echo disabled so submitted commands do not reflect into the output.
    pub fn spawn(
        program: impl AsRef<Path>,
        args: &[String],
        sink: Option<ByteSink>,
    ) -> Result<Self> {
        let program = program.as_ref();
        check_executable(program)?;

        let spawn_err = |reason: String| Error::Spawn {
            program: program.to_owned(),
            reason,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: 60,
                cols: 200,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_err(format!("openpty failed: {:#}", e)))?;

        #[cfg(unix)]
        if let Some(fd) = pair.master.as_raw_fd() {
            disable_echo(fd)?;
        }

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_err(format!("{:#}", e)))?;
        // The parent holds only the master side.
        drop(pair.slave);

        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_err(format!("cannot open terminal writer: {:#}", e)))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_err(format!("cannot open terminal reader: {:#}", e)))?;

        let (tx, rx) = mpsc::unbounded_channel();
        std::thread::spawn(move || read_loop(reader, tx, sink));

        Ok(Self {
            child,
            writer,
            rx,
            buf: String::new(),
            _master: pair.master,
        })
    }

    /// Submits one command line. The half-duplex protocol guarantees the
    /// candidate is idle here, so any bytes still buffered from the
    /// previous turn are coalesced prompt repetitions and are dropped.
    pub fn send_command(&mut self, text: &str) -> Result<()> {
        if !self.buf.trim().is_empty() {
            log::debug!(
                "Discarding {} residual byte(s) from previous turn",
                self.buf.len()
            );
        }
        self.buf.clear();
        self.writer.write_all(text.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Blocks until the candidate emits a complete prompt line or the
    /// deadline passes. Returns everything received before the first
    /// prompt match (the turn's visible output) and the matched prompt
    /// text itself.
    pub async fn await_prompt(&mut self, timeout: Duration) -> Result<(String, String)> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some((start, end)) = prompt::find_prompt(&self.buf) {
                let before = self.buf[..start].to_owned();
                let prompt_line = self.buf[start..end].to_owned();
                self.buf.drain(..end);
                return Ok((before, prompt_line));
            }
            match tokio::time::timeout_at(deadline, self.rx.recv()).await {
                Ok(Some(chunk)) => self.buf.push_str(&String::from_utf8_lossy(&chunk)),
                Ok(None) => return Err(Error::StreamClosed),
                Err(_) => return Err(Error::ResponseTimeout { budget: timeout }),
            }
        }
    }

    /// Consumes and discards the initial banner and its prompt. The
    /// protocol requires this implicit handshake before the first command.
    pub async fn handshake(&mut self, timeout: Duration) -> Result<()> {
        let _ = self.await_prompt(timeout).await?;
        Ok(())
    }

    /// Best-effort graceful shutdown: asks the candidate to quit without
    /// waiting for it to exit. A handle is never reused after this.
    pub fn terminate(&mut self) {
        if let Err(e) = self.send_command(QUIT_COMMAND) {
            log::debug!("Quit command not delivered: {:#}", e);
        }
    }
}

impl Drop for ProcessDriver {
    fn drop(&mut self) {
        // Never leave an orphaned candidate behind.
        match self.child.try_wait() {
            Ok(Some(_)) => {}
            _ => {
                self.child
                    .kill()
                    .unwrap_or_else(|e| log::warn!("Failed to kill candidate process: {:#}", e));
            }
        }
    }
}

fn read_loop(
    mut reader: Box<dyn Read + Send>,
    tx: mpsc::UnboundedSender<Vec<u8>>,
    mut sink: Option<ByteSink>,
) {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        match reader.read(&mut chunk) {
            // EOF, or EIO after the slave side closed.
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if let Some(sink) = sink.as_mut() {
                    let _ = sink.write_all(&chunk[..n]);
                }
                if tx.send(chunk[..n].to_vec()).is_err() {
                    break;
                }
            }
        }
    }
}

fn check_executable(program: &Path) -> Result<()> {
    let not_spawnable = |reason: &str| Error::Spawn {
        program: program.to_owned(),
        reason: reason.to_owned(),
    };

    // Bare names resolve through PATH; leave those to the spawn itself.
    if program.components().count() < 2 {
        return Ok(());
    }
    let meta = std::fs::metadata(program)
        .map_err(|_| not_spawnable("no such file"))?;
    if !meta.is_file() {
        return Err(not_spawnable("not a regular file"));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if meta.permissions().mode() & 0o111 == 0 {
            return Err(not_spawnable("not executable"));
        }
    }
    Ok(())
}

/// The grader reads the candidate's own output only; command echo would
/// pollute every turn.
#[cfg(unix)]
fn disable_echo(fd: std::os::unix::io::RawFd) -> Result<()> {
    // SAFETY: fd is a valid open PTY master descriptor; termios is
    // initialized by tcgetattr before use.
    unsafe {
        let mut termios: libc::termios = std::mem::zeroed();
        if libc::tcgetattr(fd, &mut termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
        termios.c_lflag &= !libc::ECHO;
        if libc::tcsetattr(fd, libc::TCSANOW, &termios) != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    Ok(())
}
