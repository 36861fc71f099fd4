use std::path::Path;

/// Multi-command binary whose first argument names the actual service.
const SERVER_LAUNCHER: &str = "arvados-server";

/// Log prefix for a child's output lines.
///
/// The program name, minus the workspace `bin/` directory. Generic launchers are replaced by the
/// target they launch (`bundle exec passenger ...` → `passenger`, `arvados-server ws` → `ws`), and
/// a relative working directory is prepended so identical programs in different trees stay apart.
pub fn log_prefix(program: &str, args: &[String], dir: &Path, bin_dir: Option<&Path>) -> String {
    let mut prefix = bin_dir
        .and_then(|bin| Path::new(program).strip_prefix(bin).ok())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| program.to_string());

    if prefix == "bundle" && args.len() > 2 && args[0] == "exec" {
        prefix = args[1].clone();
    } else if prefix == SERVER_LAUNCHER && args.len() > 1 {
        prefix = args[0].clone();
    }

    if dir.is_relative() {
        prefix = format!("{}: {prefix}", dir.display());
    }
    prefix
}
