//! Output workspace for one generation run.
//!
//! Owns the `site-<timestamp>` directory: scaffold copy, brand colours,
//! reading and writing generated files, and resolving the loose file paths
//! agents tend to return.

use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::Local;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use sitefab_agents::SourceFile;
use sitefab_spec::Branding;

use crate::error::{CoreError, CoreResult};

/// Tailwind config file patched with brand colours.
pub const TAILWIND_CONFIG: &str = "tailwind.config.ts";

/// Colour placeholders used by the scaffold's Tailwind theme.
pub const SCAFFOLD_PRIMARY: &str = "#6366F1";
pub const SCAFFOLD_SECONDARY: &str = "#10B981";

const CODE_EXTENSIONS: &[&str] = &["tsx", "ts", "css", "js", "mjs", "json"];
const EXCLUDED_DIRS: &[&str] = &["node_modules", ".next", ".vscode", ".git", ".sitefab"];
const EXCLUDED_FILES: &[&str] = &["package-lock.json"];

/// The generated project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a fresh `site-YYYYmmdd-HHMMSS` directory under `output_root`.
    ///
    /// A numeric suffix is appended when a run in the same second already
    /// claimed the name.
    pub fn create(output_root: impl AsRef<Path>) -> CoreResult<Self> {
        let output_root = output_root.as_ref();
        fs::create_dir_all(output_root)?;

        let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let mut root = output_root.join(format!("site-{}", stamp));
        let mut suffix = 2;
        while root.exists() {
            root = output_root.join(format!("site-{}-{}", stamp, suffix));
            suffix += 1;
        }
        fs::create_dir_all(&root)?;

        info!("Created output directory {:?}", root);
        Ok(Self { root })
    }

    /// Use an existing directory.
    pub fn open(root: impl AsRef<Path>) -> CoreResult<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(CoreError::Workspace(format!(
                "output directory not found: {:?}",
                root
            )));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copy the scaffold's contents into the workspace.
    pub fn apply_scaffold(&self, scaffold_dir: impl AsRef<Path>) -> CoreResult<()> {
        let scaffold_dir = scaffold_dir.as_ref();
        if !scaffold_dir.is_dir() {
            return Err(CoreError::Workspace(format!(
                "scaffold directory not found: {:?}",
                scaffold_dir
            )));
        }

        let options = fs_extra::dir::CopyOptions::new()
            .overwrite(true)
            .content_only(true);
        fs_extra::dir::copy(scaffold_dir, &self.root, &options)?;

        info!("Copied scaffold {:?} into {:?}", scaffold_dir, self.root);
        Ok(())
    }

    /// Replace the scaffold's placeholder colours in `tailwind.config.ts`.
    ///
    /// Returns `false` when the project has no Tailwind config.
    pub fn apply_brand_colors(&self, branding: &Branding) -> CoreResult<bool> {
        let path = self.root.join(TAILWIND_CONFIG);
        if !path.is_file() {
            debug!("No {} in workspace, skipping brand colours", TAILWIND_CONFIG);
            return Ok(false);
        }

        let content = fs::read_to_string(&path)?;
        let updated = replace_color(&content, SCAFFOLD_PRIMARY, branding.primary_color());
        let updated = replace_color(&updated, SCAFFOLD_SECONDARY, branding.secondary_color());
        fs::write(&path, updated)?;

        info!(
            primary = branding.primary_color(),
            secondary = branding.secondary_color(),
            "Applied brand colours"
        );
        Ok(true)
    }

    /// Absolute path of a workspace-relative file, rejecting escapes.
    pub fn path_of(&self, relative: &str) -> CoreResult<PathBuf> {
        let cleaned = clean_relative(relative);
        let candidate = Path::new(&cleaned);
        if cleaned.is_empty()
            || candidate
                .components()
                .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(CoreError::PathOutsideWorkspace(relative.to_string()));
        }
        Ok(self.root.join(candidate))
    }

    /// Write a file, creating parent directories.
    pub async fn write_file(&self, relative: &str, content: &str) -> CoreResult<PathBuf> {
        if content.is_empty() {
            return Err(CoreError::Workspace(format!(
                "refusing to write empty file {}",
                relative
            )));
        }
        let path = self.path_of(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!("Wrote {}", relative);
        Ok(path)
    }

    pub async fn read_file(&self, relative: &str) -> CoreResult<String> {
        let path = self.path_of(relative)?;
        Ok(tokio::fs::read_to_string(path).await?)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path_of(relative).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Source files of the generated project, relative and `/`-separated,
    /// sorted. Dependency and build directories are skipped.
    pub fn list_code_files(&self) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_excluded_dir(e))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("Skipping unreadable path: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && is_code_file(e))
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&self.root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();
        files
    }

    /// Read the given files, skipping any that cannot be read.
    pub async fn read_sources(&self, paths: &[String]) -> Vec<SourceFile> {
        let mut sources = Vec::with_capacity(paths.len());
        for path in paths {
            match self.read_file(path).await {
                Ok(content) => sources.push(SourceFile::new(path.clone(), content)),
                Err(e) => warn!("Could not read {}: {}", path, e),
            }
        }
        sources
    }

    /// Resolve a path named by an agent to a file in the workspace.
    pub fn resolve(&self, requested: &str) -> Option<String> {
        resolve_path(&self.list_code_files(), requested)
    }
}

/// Match a loosely specified path against known files.
///
/// Tries an exact match, then the shortest file ending with the requested
/// path on a component boundary, then the shortest file with the same name.
pub fn resolve_path(files: &[String], requested: &str) -> Option<String> {
    let requested = clean_relative(requested);
    if requested.is_empty() {
        return None;
    }

    if let Some(exact) = files.iter().find(|f| **f == requested) {
        return Some(exact.clone());
    }

    let suffix = format!("/{}", requested);
    if let Some(found) = files
        .iter()
        .filter(|f| f.ends_with(&suffix))
        .min_by_key(|f| f.len())
    {
        debug!("Resolved {} to {} by suffix", requested, found);
        return Some(found.clone());
    }

    let basename = requested.rsplit('/').next().unwrap_or(&requested);
    let found = files
        .iter()
        .filter(|f| f.rsplit('/').next() == Some(basename))
        .min_by_key(|f| f.len())?;
    debug!("Resolved {} to {} by file name", requested, found);
    Some(found.clone())
}

fn clean_relative(path: &str) -> String {
    let path = path.trim().replace('\\', "/");
    let mut path = path.as_str();
    while let Some(rest) = path.strip_prefix("./") {
        path = rest;
    }
    path.to_string()
}

fn replace_color(content: &str, placeholder: &str, color: &str) -> String {
    content
        .replace(placeholder, color)
        .replace(&placeholder.to_lowercase(), color)
}

fn is_excluded_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn is_code_file(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if EXCLUDED_FILES.contains(&name.as_ref()) {
        return false;
    }
    entry
        .path()
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| CODE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn files(paths: &[&str]) -> Vec<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_resolve_exact_then_suffix_then_name() {
        let known = files(&[
            "app/page.tsx",
            "app/contact/page.tsx",
            "src/components/Hero.tsx",
            "src/components/Hero.test.tsx",
        ]);

        assert_eq!(resolve_path(&known, "app/page.tsx").as_deref(), Some("app/page.tsx"));
        assert_eq!(resolve_path(&known, "./app/page.tsx").as_deref(), Some("app/page.tsx"));
        assert_eq!(
            resolve_path(&known, "components/Hero.tsx").as_deref(),
            Some("src/components/Hero.tsx")
        );
        // both pages end with /page.tsx; the shorter one wins
        assert_eq!(resolve_path(&known, "page.tsx").as_deref(), Some("app/page.tsx"));
        assert_eq!(
            resolve_path(&known, "components/ui/Hero.tsx").as_deref(),
            Some("src/components/Hero.tsx")
        );
        assert_eq!(resolve_path(&known, "Footer.tsx"), None);
        assert_eq!(resolve_path(&known, ""), None);
    }

    #[test]
    fn test_suffix_respects_component_boundary() {
        let known = files(&["src/components/SuperHero.tsx"]);
        assert_eq!(resolve_path(&known, "Hero.tsx"), None);
    }

    #[test]
    fn test_create_unique_directories() {
        let temp = TempDir::new().unwrap();
        let first = Workspace::create(temp.path()).unwrap();
        let second = Workspace::create(temp.path()).unwrap();
        assert_ne!(first.root(), second.root());
        assert!(first
            .root()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("site-"));
    }

    #[test]
    fn test_scaffold_and_brand_colors() {
        let temp = TempDir::new().unwrap();
        let scaffold = temp.path().join("scaffold");
        fs::create_dir_all(scaffold.join("app")).unwrap();
        fs::write(scaffold.join("app/layout.tsx"), "export default function L() {}").unwrap();
        fs::write(
            scaffold.join(TAILWIND_CONFIG),
            "colors: { primary: '#6366F1', secondary: '#10b981' }",
        )
        .unwrap();

        let workspace = Workspace::create(temp.path().join("out")).unwrap();
        workspace.apply_scaffold(&scaffold).unwrap();
        let branding = Branding {
            colors: [("primary".to_string(), "#112233".to_string())]
                .into_iter()
                .collect(),
        };
        assert!(workspace.apply_brand_colors(&branding).unwrap());

        let config = fs::read_to_string(workspace.root().join(TAILWIND_CONFIG)).unwrap();
        assert!(config.contains("primary: '#112233'"));
        assert!(config.contains("secondary: '#FFFFFF'"));
        assert!(workspace.exists("app/layout.tsx"));
    }

    #[test]
    fn test_missing_scaffold_is_an_error() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::create(temp.path()).unwrap();
        assert!(workspace.apply_scaffold(temp.path().join("nope")).is_err());
        assert!(!workspace.apply_brand_colors(&Branding::default()).unwrap());
    }

    #[tokio::test]
    async fn test_write_read_and_list() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::open(temp.path()).unwrap();

        workspace
            .write_file("src/components/Hero.tsx", "export default function Hero() {}")
            .await
            .unwrap();
        workspace.write_file("app/page.tsx", "page").await.unwrap();
        workspace.write_file("README.md", "docs").await.unwrap();
        workspace.write_file("package-lock.json", "{}").await.unwrap();
        workspace
            .write_file("node_modules/react/index.js", "module.exports = {}")
            .await
            .unwrap();

        assert_eq!(
            workspace.list_code_files(),
            vec!["app/page.tsx".to_string(), "src/components/Hero.tsx".to_string()]
        );
        assert_eq!(workspace.read_file("app/page.tsx").await.unwrap(), "page");
        assert_eq!(
            workspace.resolve("Hero.tsx").as_deref(),
            Some("src/components/Hero.tsx")
        );
    }

    #[tokio::test]
    async fn test_rejects_paths_outside_workspace() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::open(temp.path()).unwrap();

        assert!(matches!(
            workspace.write_file("../escape.tsx", "x").await,
            Err(CoreError::PathOutsideWorkspace(_))
        ));
        assert!(workspace.write_file("/etc/passwd", "x").await.is_err());
        assert!(workspace.write_file("app/empty.tsx", "").await.is_err());
    }
}
