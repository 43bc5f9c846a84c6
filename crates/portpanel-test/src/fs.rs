//! In-memory [`HostFs`] with chmod/touch semantics and fault injection.

use std::collections::{HashMap, HashSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::debug;

use portpanel_common::{ExecResult, HostFs, PanelError, PanelResult};

#[derive(Debug, Clone)]
struct MemFile {
    content: String,
    mode: u32,
}

#[derive(Debug, Default)]
struct State {
    files: HashMap<String, MemFile>,
    commands: Vec<String>,
    failing: HashSet<String>,
    corrupt_with: Option<String>,
    fail_writes: bool,
}

/// A file system held in memory.
///
/// Files written with mode `0o444` reject writes until chmod'ed back.
/// `chmod` fails on missing files; `touch` creates them with mode `0o644`.
/// Utilities are matched by the last path component of the program.
#[derive(Debug, Default)]
pub struct MemFs {
    state: Mutex<State>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MemFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates or replaces a file with mode `0o644`.
    pub fn put(&self, path: &str, content: &str) {
        self.put_with_mode(path, content, 0o644);
    }

    pub fn put_with_mode(&self, path: &str, content: &str, mode: u32) {
        self.state().files.insert(
            path.to_string(),
            MemFile {
                content: content.to_string(),
                mode,
            },
        );
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.state().files.get(path).map(|f| f.content.clone())
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.state().files.get(path).map(|f| f.mode)
    }

    /// Every utility invocation so far, as `program arg...`.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Makes a utility (e.g. "chmod") exit non-zero.
    pub fn fail_command(&self, name: &str) {
        self.state().failing.insert(name.to_string());
    }

    /// Makes every write store `content` instead of the given data.
    pub fn corrupt_writes(&self, content: &str) {
        self.state().corrupt_with = Some(content.to_string());
    }

    /// Makes every write fail with an I/O error.
    pub fn fail_writes(&self) {
        self.state().fail_writes = true;
    }

    /// Blocks writes until permits are added to the returned semaphore.
    pub fn gate_writes(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.write_gate.lock().unwrap_or_else(|e| e.into_inner()) = Some(gate.clone());
        gate
    }

    fn chmod(state: &mut State, args: &[&str]) -> ExecResult {
        let [mode, path] = args else {
            return ExecResult::failed(1, "chmod: missing operand");
        };
        let Ok(mode) = u32::from_str_radix(mode, 8) else {
            return ExecResult::failed(1, format!("chmod: invalid mode: '{}'", mode));
        };
        match state.files.get_mut(*path) {
            Some(file) => {
                file.mode = mode;
                ExecResult::ok("")
            }
            None => ExecResult::failed(
                1,
                format!("chmod: cannot access '{}': No such file or directory", path),
            ),
        }
    }

    fn touch(state: &mut State, args: &[&str]) -> ExecResult {
        for path in args {
            state.files.entry(path.to_string()).or_insert(MemFile {
                content: String::new(),
                mode: 0o644,
            });
        }
        ExecResult::ok("")
    }
}

#[async_trait]
impl HostFs for MemFs {
    async fn read(&self, path: &str) -> PanelResult<Option<String>> {
        Ok(self.content(path))
    }

    async fn write(&self, path: &str, data: &str) -> PanelResult<()> {
        let gate = self
            .write_gate
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(gate) = gate {
            debug!("Write to {} waiting on gate", path);
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let mut state = self.state();
        if state.fail_writes {
            return Err(PanelError::io(
                path,
                io::Error::new(io::ErrorKind::Other, "injected write failure"),
            ));
        }

        let content = state
            .corrupt_with
            .clone()
            .unwrap_or_else(|| data.to_string());
        match state.files.get_mut(path) {
            Some(file) if file.mode & 0o200 == 0 => Err(PanelError::io(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"),
            )),
            Some(file) => {
                file.content = content;
                Ok(())
            }
            None => {
                state.files.insert(
                    path.to_string(),
                    MemFile {
                        content,
                        mode: 0o644,
                    },
                );
                Ok(())
            }
        }
    }

    async fn exec(&self, program: &str, args: &[&str]) -> PanelResult<ExecResult> {
        let mut state = self.state();
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        state.commands.push(line);

        let name = program.rsplit('/').next().unwrap_or(program);
        if state.failing.contains(name) {
            return Ok(ExecResult::failed(1, format!("{}: operation not permitted", name)));
        }

        Ok(match name {
            "chmod" => Self::chmod(&mut state, args),
            "touch" => Self::touch(&mut state, args),
            _ => ExecResult::failed(127, format!("{}: not found", program)),
        })
    }
}
