// Spawning and waiting on a single child process.

use crate::invocation::Invocation;
use executils_core::{OutputSink, ProcessFailure, SharedWriter};
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use tracing::debug;

/// Build the `Command` described by `inv`.
pub(crate) fn command_for(inv: &Invocation) -> Command {
    let mut cmd = Command::new(&inv.program);

    if let Some((argv0, rest)) = inv.args.split_first() {
        set_argv0(&mut cmd, argv0);
        cmd.args(rest);
    }

    if let Some(dir) = &inv.dir {
        cmd.current_dir(dir);
    }

    // Later duplicates replace earlier ones.
    cmd.env_clear();
    for (key, value) in inv.env.vars() {
        cmd.env(key, value);
    }

    cmd.stdin(Stdio::inherit())
        .stdout(inv.stdout.stdio())
        .stderr(inv.stderr.stdio());

    cmd
}

#[cfg(unix)]
fn set_argv0(cmd: &mut Command, argv0: &str) {
    use std::os::unix::process::CommandExt;
    cmd.arg0(argv0);
}

#[cfg(not(unix))]
fn set_argv0(_cmd: &mut Command, _argv0: &str) {}

/// Run `inv` to completion.
///
/// Piped output is drained on scoped threads that are joined before this
/// returns.
pub(crate) fn execute(inv: &Invocation) -> Result<(), ProcessFailure> {
    let mut child = command_for(inv).spawn().map_err(ProcessFailure::Spawn)?;

    debug!(pid = child.id(), program = %inv.program.display(), "Process spawned");

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, forwarded) = thread::scope(|scope| {
        let out_pump = stdout.map(|reader| scope.spawn(|| forward(reader, &inv.stdout)));
        let err_pump = stderr.map(|reader| scope.spawn(|| forward(reader, &inv.stderr)));

        let status = child.wait();

        let forwarded = [out_pump, err_pump]
            .into_iter()
            .flatten()
            .map(|handle| {
                handle
                    .join()
                    .unwrap_or_else(|_| Err(io::Error::new(io::ErrorKind::Other, "output forwarder panicked")))
            })
            .collect::<io::Result<Vec<()>>>();

        (status, forwarded)
    });

    let status = status.map_err(ProcessFailure::Spawn)?;

    debug!(program = %inv.program.display(), status = %status, "Process finished");

    if let Some(failure) = ProcessFailure::from_status(status) {
        return Err(failure);
    }

    forwarded.map_err(ProcessFailure::Output)?;
    Ok(())
}

fn forward<R: Read>(reader: R, sink: &OutputSink) -> io::Result<()> {
    match sink {
        OutputSink::Writer(writer) => copy_into(reader, writer),
        // Only writer sinks are piped.
        OutputSink::Inherit | OutputSink::Null => Ok(()),
    }
}

fn copy_into<R: Read>(mut reader: R, writer: &SharedWriter) -> io::Result<()> {
    let mut buf = [0u8; 8192];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(()),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };

        let mut writer = writer
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "output sink lock poisoned"))?;
        writer.write_all(&buf[..n])?;
        writer.flush()?;
    }
}
