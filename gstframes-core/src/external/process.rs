// ============================================================================
// gstframes-core/src/external/process.rs
// ============================================================================
//
// PROCESS SPAWNER: std::process Implementation of PipelineSpawner
//
// The side channel is an anonymous pipe. Both ends are created close-on-exec;
// in the child, between fork and exec, the write end is duplicated onto the
// agreed descriptor number, which clears close-on-exec on the duplicate only.
// The parent drops its copy of the write end right after spawning so that the
// read end reports EOF once the child is gone.
//
// std reports a failed exec through its own close-on-exec pipe, created while
// spawning. If that pipe received the agreed descriptor number, the dup2 in
// the child would overwrite it and a failed exec would look like a successful
// spawn. While the number is free in the parent it is therefore held by a
// copy of the write end for the duration of the spawn.

use super::{PipelineProcess, PipelineSpawner, SpawnedPipeline};
use crate::error::{CoreError, CoreResult, command_start_error, command_wait_error};
use crate::pipeline::PipelineCommand;
use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, ExitStatus, Stdio};

/// Spawns real subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessSpawner;

/// A std::process child wrapped as a [`PipelineProcess`].
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    name: String,
}

impl ChildProcess {
    pub fn new(child: Child, name: impl Into<String>) -> Self {
        Self {
            child,
            name: name.into(),
        }
    }
}

impl PipelineProcess for ChildProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn kill(&mut self) -> CoreResult<()> {
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(CoreError::Io(e)),
        }
    }

    fn try_wait(&mut self) -> CoreResult<Option<ExitStatus>> {
        self.child
            .try_wait()
            .map_err(|e| command_wait_error(&self.name, e))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.child.wait().map_err(|e| command_wait_error(&self.name, e))
    }
}

/// Creates a pipe with close-on-exec set on both ends.
fn cloexec_pipe() -> io::Result<(File, OwnedFd)> {
    let mut fds: [libc::c_int; 2] = [-1, -1];

    #[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
    {
        // SAFETY: `fds` is a valid two-element buffer.
        if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
            return Err(io::Error::last_os_error());
        }
    }

    #[cfg(not(any(target_os = "linux", target_os = "android", target_os = "freebsd")))]
    {
        // SAFETY: `fds` is a valid two-element buffer.
        if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        for fd in fds {
            // SAFETY: `fd` was just returned by pipe().
            if unsafe { libc::fcntl(fd, libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
                let err = io::Error::last_os_error();
                // SAFETY: both descriptors are owned here and not used afterwards.
                unsafe {
                    libc::close(fds[0]);
                    libc::close(fds[1]);
                }
                return Err(err);
            }
        }
    }

    // SAFETY: pipe() returned two fresh descriptors that nothing else owns.
    let reader = unsafe { File::from_raw_fd(fds[0]) };
    let writer = unsafe { OwnedFd::from_raw_fd(fds[1]) };
    Ok((reader, writer))
}

/// Holds `target` as a close-on-exec copy of `fd` if the number is free.
///
/// `F_DUPFD_CLOEXEC` takes the lowest free number at or above `target`, so
/// checking and taking the number is one step. A number already in use stays
/// with its owner and `None` is returned.
fn reserve_descriptor(fd: &OwnedFd, target: RawFd) -> io::Result<Option<OwnedFd>> {
    // SAFETY: fcntl on a descriptor owned by this process.
    let dup = unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_DUPFD_CLOEXEC, target) };
    if dup < 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: fcntl returned a fresh descriptor that nothing else owns.
    let dup = unsafe { OwnedFd::from_raw_fd(dup) };
    Ok((dup.as_raw_fd() == target).then_some(dup))
}

/// Makes `source` available as `target` in the current (child) process.
///
/// Runs between fork and exec, so it only uses async-signal-safe calls.
fn map_descriptor(source: RawFd, target: RawFd) -> io::Result<()> {
    if source == target {
        // dup2 onto itself is a no-op and would leave close-on-exec set.
        // SAFETY: plain fcntl calls on a descriptor owned by this process.
        let flags = unsafe { libc::fcntl(source, libc::F_GETFD) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if unsafe { libc::fcntl(source, libc::F_SETFD, flags & !libc::FD_CLOEXEC) } < 0 {
            return Err(io::Error::last_os_error());
        }
        return Ok(());
    }
    // SAFETY: dup2 on descriptors owned by this process.
    if unsafe { libc::dup2(source, target) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl PipelineSpawner for ProcessSpawner {
    fn spawn_capturing(
        &self,
        cmd: &PipelineCommand,
        side_channel_fd: i32,
    ) -> CoreResult<SpawnedPipeline> {
        let name = cmd.program_name();
        let (reader, writer) = cloexec_pipe()?;
        let reserved = reserve_descriptor(&writer, side_channel_fd)?;
        let source_fd = reserved
            .as_ref()
            .map_or_else(|| writer.as_raw_fd(), AsRawFd::as_raw_fd);

        let mut command = cmd.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        // SAFETY: the closure only calls dup2/fcntl.
        unsafe {
            command.pre_exec(move || map_descriptor(source_fd, side_channel_fd));
        }

        log::debug!("Executing command: {}", cmd);
        let mut child = command
            .spawn()
            .map_err(|e| command_start_error(&name, e))?;

        // The child holds its own copy now.
        drop(reserved);
        drop(writer);

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(command_start_error(
                &name,
                io::Error::other("stdout was not captured"),
            ));
        };

        log::debug!("Started '{}' with pid {}", name, child.id());
        Ok(SpawnedPipeline {
            process: Box::new(ChildProcess::new(child, name)),
            stdout: Box::new(stdout),
            side_channel: Box::new(reader),
        })
    }

    fn spawn_inherited(&self, cmd: &PipelineCommand) -> CoreResult<Box<dyn PipelineProcess>> {
        let name = cmd.program_name();
        log::debug!("Executing command: {}", cmd);
        let child = cmd
            .to_command()
            .spawn()
            .map_err(|e| command_start_error(&name, e))?;
        Ok(Box::new(ChildProcess::new(child, name)))
    }
}
