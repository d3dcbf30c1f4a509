//! Host tool detection.
//!
//! Validators ask a [`ToolProbe`] whether a native compiler is installed and
//! pick the native or fallback path accordingly. The probe is passed into the
//! registry explicitly so tests can force either path regardless of what the
//! test machine has installed.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// External tools a validator may shell out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    ClangPlusPlus,
    Clang,
    CheckPolicy,
    Java,
    PlantUmlJar,
    Kotlinc,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::ClangPlusPlus,
        Tool::Clang,
        Tool::CheckPolicy,
        Tool::Java,
        Tool::PlantUmlJar,
        Tool::Kotlinc,
    ];

    /// Executable (or artifact) name looked up on the host.
    pub fn name(&self) -> &'static str {
        match self {
            Tool::ClangPlusPlus => "clang++",
            Tool::Clang => "clang",
            Tool::CheckPolicy => "checkpolicy",
            Tool::Java => "java",
            Tool::PlantUmlJar => "plantuml.jar",
            Tool::Kotlinc => "kotlinc",
        }
    }

    fn index(&self) -> usize {
        match self {
            Tool::ClangPlusPlus => 0,
            Tool::Clang => 1,
            Tool::CheckPolicy => 2,
            Tool::Java => 3,
            Tool::PlantUmlJar => 4,
            Tool::Kotlinc => 5,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Tool name → available, as seen by one probe.
pub type ToolAvailability = BTreeMap<String, bool>;

/// Answers "is this tool installed, and where".
///
/// Implementations must never fail: an unresolvable lookup is simply `None`.
pub trait ToolProbe: Send + Sync + fmt::Debug {
    /// Resolved path of `tool`, if present.
    fn locate(&self, tool: Tool) -> Option<PathBuf>;

    fn is_available(&self, tool: Tool) -> bool {
        self.locate(tool).is_some()
    }

    /// Availability of every known tool.
    fn availability(&self) -> ToolAvailability {
        Tool::ALL
            .iter()
            .map(|t| (t.name().to_string(), self.is_available(*t)))
            .collect()
    }
}

/// Well-known install locations for the PlantUML jar.
pub fn default_plantuml_jar_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/usr/share/plantuml/plantuml.jar"),
        PathBuf::from("/usr/local/bin/plantuml.jar"),
    ];
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(Path::new(&home).join("plantuml.jar"));
    }
    paths
}

/// Probe backed by the real host: `PATH` lookups, memoised per tool.
///
/// Each tool is resolved at most once; after that reads are lock-free.
pub struct HostToolProbe {
    search_path: Option<OsString>,
    jar_candidates: Vec<PathBuf>,
    cache: [OnceLock<Option<PathBuf>>; 6],
}

impl HostToolProbe {
    /// Probe the current process `PATH` and the default jar locations.
    pub fn new() -> Self {
        Self::with_search_path(std::env::var_os("PATH"), default_plantuml_jar_paths())
    }

    /// Probe an explicit search path and jar candidate list.
    pub fn with_search_path(search_path: Option<OsString>, jar_candidates: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            jar_candidates,
            cache: std::array::from_fn(|_| OnceLock::new()),
        }
    }

    fn resolve(&self, tool: Tool) -> Option<PathBuf> {
        let found = match tool {
            Tool::PlantUmlJar => self.jar_candidates.iter().find(|p| p.is_file()).cloned(),
            _ => {
                let path = self.search_path.as_ref()?;
                std::env::split_paths(path)
                    .map(|dir| dir.join(tool.name()))
                    .find(|candidate| is_executable(candidate))
            }
        };
        tracing::debug!(tool = tool.name(), found = ?found, "probed host tool");
        found
    }
}

impl Default for HostToolProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HostToolProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostToolProbe")
            .field("jar_candidates", &self.jar_candidates)
            .finish_non_exhaustive()
    }
}

impl ToolProbe for HostToolProbe {
    fn locate(&self, tool: Tool) -> Option<PathBuf> {
        self.cache[tool.index()]
            .get_or_init(|| self.resolve(tool))
            .clone()
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Fixed tool table, for tests and for pinning a deterministic path.
#[derive(Debug, Clone, Default)]
pub struct StaticToolProbe {
    tools: HashMap<Tool, PathBuf>,
}

impl StaticToolProbe {
    /// Nothing installed: every validator takes its fallback path.
    pub fn none() -> Self {
        Self::default()
    }

    /// Register `tool` as installed at `path`.
    pub fn with_tool(mut self, tool: Tool, path: impl Into<PathBuf>) -> Self {
        self.tools.insert(tool, path.into());
        self
    }
}

impl ToolProbe for StaticToolProbe {
    fn locate(&self, tool: Tool) -> Option<PathBuf> {
        self.tools.get(&tool).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_probe_none_reports_nothing() {
        let probe = StaticToolProbe::none();
        assert!(Tool::ALL.iter().all(|t| !probe.is_available(*t)));
        assert_eq!(probe.availability().len(), Tool::ALL.len());
    }

    #[test]
    fn test_static_probe_with_tool() {
        let probe = StaticToolProbe::none().with_tool(Tool::CheckPolicy, "/opt/checkpolicy");
        assert!(probe.is_available(Tool::CheckPolicy));
        assert_eq!(
            probe.locate(Tool::CheckPolicy),
            Some(PathBuf::from("/opt/checkpolicy"))
        );
        assert_eq!(probe.availability()["checkpolicy"], true);
        assert_eq!(probe.availability()["kotlinc"], false);
    }

    #[test]
    fn test_host_probe_without_path_finds_nothing() {
        let probe = HostToolProbe::with_search_path(None, Vec::new());
        assert!(!probe.is_available(Tool::ClangPlusPlus));
        assert!(!probe.is_available(Tool::PlantUmlJar));
    }

    #[cfg(unix)]
    #[test]
    fn test_host_probe_finds_executable_on_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("checkpolicy");
        std::fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
        // Present but not executable: must be ignored.
        std::fs::write(dir.path().join("kotlinc"), "").unwrap();

        let probe =
            HostToolProbe::with_search_path(Some(dir.path().as_os_str().to_owned()), Vec::new());
        assert_eq!(probe.locate(Tool::CheckPolicy), Some(exe));
        assert!(!probe.is_available(Tool::Kotlinc));
    }

    #[test]
    fn test_host_probe_memoises_first_answer() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("plantuml.jar");
        let probe = HostToolProbe::with_search_path(None, vec![jar.clone()]);

        assert!(!probe.is_available(Tool::PlantUmlJar));
        std::fs::write(&jar, b"PK").unwrap();
        // Tool presence is fixed for the life of the probe.
        assert!(!probe.is_available(Tool::PlantUmlJar));

        let fresh = HostToolProbe::with_search_path(None, vec![jar.clone()]);
        assert_eq!(fresh.locate(Tool::PlantUmlJar), Some(jar));
    }
}
