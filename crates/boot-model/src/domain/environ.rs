use std::collections::HashSet;

/// Ordered list of `KEY=VALUE` entries passed to child processes.
///
/// Mutation happens while the supervisor prepares the run; afterwards the list is only read.
/// Lookups and [`Environ::dedup`] resolve duplicates in favour of the *first* entry, so anything
/// placed in front of the list overrides what follows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environ(Vec<String>);

impl Environ {
    /// Create an environment from raw `KEY=VALUE` entries.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(entries.into_iter().map(Into::into).collect())
    }

    /// Snapshot of the current process environment (non-UTF-8 entries are converted lossily).
    pub fn from_host() -> Self {
        Self(
            std::env::vars_os()
                .map(|(k, v)| format!("{}={}", k.to_string_lossy(), v.to_string_lossy()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.0
    }

    /// Value of the first entry for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find_map(|kv| value_of(kv, key))
    }

    /// Replace the first entry for `key`, or append a new one.
    pub fn set(&mut self, key: &str, value: &str) {
        match self.position(key) {
            Some(i) => self.0[i] = format!("{key}={value}"),
            None => self.0.push(format!("{key}={value}")),
        }
    }

    /// Prepend `prefix` to the value of `key` (e.g. `PATH`), creating the entry if absent.
    ///
    /// The prefix is inserted verbatim, so callers supply their own separator (`"/opt/bin:"`).
    pub fn prepend(&mut self, key: &str, prefix: &str) {
        match self.position(key) {
            Some(i) => {
                let old = &self.0[i][key.len() + 1..];
                self.0[i] = format!("{key}={prefix}{old}");
            }
            None => self.0.push(format!("{key}={prefix}")),
        }
    }

    /// Drop every entry that starts with one of `prefixes`.
    ///
    /// Prefixes match the raw entry text: `"ARVADOS_"` drops a family of keys, `"GEM_HOME="` exactly one key.
    pub fn strip_prefixes(&mut self, prefixes: &[&str]) {
        self.0
            .retain(|kv| !prefixes.iter().any(|p| kv.starts_with(p)));
    }

    /// Keep only the first occurrence of each key.
    ///
    /// # Panics
    ///
    /// Panics if an entry has no `=` or an empty key; entries are produced by this type or the
    /// host, so a malformed one is a programming error.
    pub fn dedup(&self) -> Vec<String> {
        dedup_entries(&self.0)
    }

    /// `extra` entries followed by this environment, deduplicated so `extra` wins on collision.
    pub fn merged(&self, extra: &[String]) -> Vec<String> {
        let all: Vec<String> = extra.iter().chain(self.0.iter()).cloned().collect();
        dedup_entries(&all)
    }

    /// Absolute path of `program` found in this environment's `PATH`, if any executable matches.
    pub fn look_path(&self, program: &str) -> Option<std::path::PathBuf> {
        let path = self.get("PATH")?;
        std::env::split_paths(path)
            .map(|dir| dir.join(program))
            .find(|candidate| is_executable(candidate))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.0.iter().position(|kv| value_of(kv, key).is_some())
    }
}

impl<S: Into<String>> FromIterator<S> for Environ {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

fn value_of<'a>(kv: &'a str, key: &str) -> Option<&'a str> {
    kv.strip_prefix(key)?.strip_prefix('=')
}

fn dedup_entries(entries: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());
    for kv in entries {
        match kv.find('=') {
            Some(split) if split > 0 => {
                if seen.insert(&kv[..split]) {
                    out.push(kv.clone());
                }
            }
            _ => panic!("invalid environment var: {kv}"),
        }
    }
    out
}

#[cfg(unix)]
fn is_executable(path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &std::path::Path) -> bool {
    path.is_file()
}
