use std::path::Path;

use boot_exec::{ProcRunner, ProcSpec};
use boot_model::{ClusterType, Environ};
use tokio_util::sync::CancellationToken;

use crate::BootError;

/// Host environment as children see it: no inherited `ARVADOS_*`, the generated config, and
/// the workspace's `bin/` first on `PATH`.
pub(crate) fn child_environ(
    host: Environ,
    config_file: &Path,
    cluster_type: ClusterType,
    workspace: &Path,
) -> Environ {
    let mut env = host;
    env.strip_prefixes(&["ARVADOS_"]);
    env.set("ARVADOS_CONFIG", &config_file.to_string_lossy());
    env.set("RAILS_ENV", cluster_type.as_str());
    env.set("TMPDIR", &workspace.to_string_lossy());
    env.prepend("PATH", &format!("{}:", workspace.join("bin").display()));
    env
}

/// Commit hash of the source tree, suffixed `+uncommitted` when the tree is dirty.
pub(crate) async fn source_version(
    runner: &ProcRunner,
    cancel: &CancellationToken,
) -> Result<String, BootError> {
    let diff = runner
        .output(cancel, &ProcSpec::new("git").args(["diff", "--shortstat"]))
        .await?;
    let head = runner
        .output(cancel, &ProcSpec::new("git").args(["log", "-n1", "--format=%H"]))
        .await?;
    let mut version = head.trim().to_string();
    if !diff.is_empty() {
        version.push_str("+uncommitted");
    }
    Ok(version)
}

/// Point gem tooling at the user gem path and `HOME` at the real home directory.
///
/// Left alone under rvm, which is assumed to have set things up already.
pub(crate) async fn setup_ruby_env<F>(
    env: &mut Environ,
    runner_for: F,
    cancel: &CancellationToken,
) -> Result<(), BootError>
where
    F: Fn(&Environ) -> ProcRunner,
{
    if env.get("rvm_path").is_none_or(str::is_empty) {
        env.strip_prefixes(&["GEM_HOME=", "GEM_PATH="]);
        let out = runner_for(env)
            .output(cancel, &ProcSpec::new("gem").args(["env", "gempath"]))
            .await?;
        let gempath = out.split(':').next().unwrap_or_default().trim();
        if gempath.is_empty() {
            return Err(BootError::Config("gem env gempath: no output".to_string()));
        }
        env.prepend("PATH", &format!("{gempath}/bin:"));
        env.set("GEM_HOME", gempath);
        env.set("GEM_PATH", gempath);
    }
    // Passenger install needs the real home directory.
    let home = dirs::home_dir()
        .ok_or_else(|| BootError::Config("cannot determine home directory".to_string()))?;
    env.set("HOME", &home.to_string_lossy());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_environ_layout() {
        let host = Environ::new([
            "PATH=/usr/bin",
            "ARVADOS_API_TOKEN=secret",
            "ARVADOS_CONFIG=/etc/arvados/config.yml",
            "LANG=C",
        ]);
        let env = child_environ(
            host,
            Path::new("/tmp/ws/config.yml"),
            ClusterType::Test,
            Path::new("/tmp/ws"),
        );
        assert_eq!(env.get("ARVADOS_API_TOKEN"), None);
        assert_eq!(env.get("ARVADOS_CONFIG"), Some("/tmp/ws/config.yml"));
        assert_eq!(env.get("RAILS_ENV"), Some("test"));
        assert_eq!(env.get("TMPDIR"), Some("/tmp/ws"));
        assert_eq!(env.get("PATH"), Some("/tmp/ws/bin:/usr/bin"));
        assert_eq!(env.get("LANG"), Some("C"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn ruby_env_under_rvm_only_sets_home() {
        let mut env = Environ::new(["rvm_path=/usr/local/rvm", "GEM_HOME=/keep", "PATH=/usr/bin"]);
        let cancel = CancellationToken::new();
        setup_ruby_env(&mut env, |e| ProcRunner::new(e.clone()), &cancel)
            .await
            .unwrap();
        assert_eq!(env.get("GEM_HOME"), Some("/keep"));
        assert_eq!(env.get("PATH"), Some("/usr/bin"));
        assert!(env.get("HOME").is_some());
    }
}
