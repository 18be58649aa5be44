//! `import` of serialized programs

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::{load_program, FrameKind, InterpResult, Interpreter, RuntimeError};

impl Interpreter {
    /// Load another program relative to the importing one and run its
    /// top-level statements. Each canonical path runs at most once.
    pub(crate) fn exec_import(&mut self, path: &str, line: usize) -> InterpResult<()> {
        let file = self.resolve_import(path).map_err(|e| e.at_line(line))?;
        if !self.ctx.imported.insert(file.clone()) {
            debug!(path = %file.display(), "already imported");
            return Ok(());
        }
        if self.config.echo_imports {
            info!(path = %file.display(), "import");
        } else {
            debug!(path = %file.display(), "import");
        }

        let program = load_program(&file).map_err(|e| e.at_line(line))?;
        let name = file.display().to_string();
        self.hoist_functions(&program, Some(&name))?;

        let saved_source = std::mem::replace(&mut self.ctx.source, name.clone());
        let saved_dir = std::mem::replace(
            &mut self.ctx.base_dir,
            file.parent().map(Path::to_path_buf),
        );
        let result = self.with_frame(line, FrameKind::Script, name, |this| {
            this.exec_stmts(&program.statements)
        });
        self.ctx.source = saved_source;
        self.ctx.base_dir = saved_dir;
        result.map(|_| ())
    }

    fn resolve_import(&self, path: &str) -> InterpResult<PathBuf> {
        let raw = Path::new(path);
        let joined = match &self.ctx.base_dir {
            Some(dir) if raw.is_relative() => dir.join(raw),
            _ => raw.to_path_buf(),
        };
        joined
            .canonicalize()
            .map_err(|e| RuntimeError::io(format!("Cannot import '{path}': {e}")))
    }
}
