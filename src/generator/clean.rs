//! Safe regeneration.
//!
//! Generator-owned output is recognizable in two ways: shared files start
//! with [`GENERATED_MARKER`] as their first non-blank content, and per-module
//! output directories carry a hidden [`DIR_MARKER`] file recording the spec
//! that produced them. Cleaning only ever deletes marker-stamped files inside
//! marker-stamped directories of the same spec, plus the shared generated
//! files. Anything hand-written survives.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::project::OutputLayout;
use crate::error::{GenError, Result};

/// First line of every generated file.
pub const GENERATED_MARKER: &str = "# generated - DO NOT EDIT";

/// Hidden file stamping a generator-owned module directory.
pub const DIR_MARKER: &str = ".codegen";

const DIR_MARKER_PREFIX: &str = "generated from: ";

// Leading blank lines before the marker are tolerated up to this many bytes.
const MARKER_PROBE_BYTES: u64 = 512;

/// Whether `path` is a regular file whose first non-blank content is the
/// generated marker. Unreadable files count as hand-written.
pub fn is_generated_file(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }
    let mut head = Vec::new();
    let read = fs::File::open(path)
        .and_then(|f| f.take(MARKER_PROBE_BYTES).read_to_end(&mut head));
    if read.is_err() {
        return false;
    }
    String::from_utf8_lossy(&head)
        .trim_start()
        .starts_with(GENERATED_MARKER)
}

/// Spec path as recorded in directory markers (always `/`-separated).
pub fn spec_origin(spec_path: &Path) -> String {
    spec_path.to_string_lossy().replace('\\', "/")
}

/// Contents of the directory marker for `spec_path`.
pub fn dir_marker_contents(spec_path: &Path) -> String {
    format!("{DIR_MARKER_PREFIX}{}\n", spec_origin(spec_path))
}

/// Spec path recorded in `dir`'s marker, if the directory is stamped.
pub fn dir_marker_origin(dir: &Path) -> Option<String> {
    let text = fs::read_to_string(dir.join(DIR_MARKER)).ok()?;
    let line = text.lines().next()?.trim();
    Some(
        line.strip_prefix(DIR_MARKER_PREFIX.trim_end())
            .unwrap_or(line)
            .trim()
            .to_string(),
    )
}

/// Everything one clean pass will delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanPlan {
    /// Files to delete (generated files and directory markers).
    pub files: Vec<PathBuf>,
    /// Directories to remove if they end up empty, deepest first.
    pub dirs: Vec<PathBuf>,
    /// Stamped directories left alone because another spec owns them.
    pub foreign: Vec<PathBuf>,
}

/// Work out what a clean would delete for the spec at `spec_path`.
///
/// Every subdirectory of the models/schemas/services/api roots is considered
/// so that modules dropped from the spec are cleaned too.
pub fn plan_clean(layout: &OutputLayout, spec_path: &Path) -> Result<CleanPlan> {
    let origin = spec_origin(spec_path);
    let mut plan = CleanPlan::default();

    for file in layout.shared_files() {
        if is_generated_file(&file) {
            plan.files.push(file);
        }
    }

    for root in layout.module_roots() {
        let entries = match fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(GenError::fs(root, e)),
        };
        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_dir())
            .collect();
        subdirs.sort();

        for dir in subdirs {
            match dir_marker_origin(&dir) {
                None => debug!(dir = %dir.display(), "no marker; leaving directory alone"),
                Some(found) if found != origin => {
                    info!(dir = %dir.display(), owner = %found, "directory belongs to another spec");
                    plan.foreign.push(dir);
                }
                Some(_) => collect_owned(&dir, &mut plan)?,
            }
        }
    }
    Ok(plan)
}

fn collect_owned(dir: &Path, plan: &mut CleanPlan) -> Result<()> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| GenError::fs(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_owned(&path, plan)?;
        } else if path.file_name().is_some_and(|n| n == DIR_MARKER) || is_generated_file(&path) {
            plan.files.push(path);
        }
    }
    plan.dirs.push(dir.to_path_buf());
    Ok(())
}

/// Execute a plan. Returns the paths actually removed (or that would be
/// removed, for a dry run).
pub fn apply_clean(plan: &CleanPlan, dry_run: bool) -> Result<Vec<PathBuf>> {
    if dry_run {
        return Ok(plan.files.clone());
    }
    let mut removed = Vec::with_capacity(plan.files.len());
    for file in &plan.files {
        match fs::remove_file(file) {
            Ok(()) => removed.push(file.clone()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(GenError::fs(file, e)),
        }
    }
    for dir in &plan.dirs {
        let empty = fs::read_dir(dir)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if empty {
            fs::remove_dir(dir).map_err(|e| GenError::fs(dir, e))?;
            removed.push(dir.clone());
        } else {
            debug!(dir = %dir.display(), "keeping directory with hand-written files");
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenConfig;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_is_generated_file() {
        let dir = TempDir::new().unwrap();
        let generated = dir.path().join("a.py");
        let padded = dir.path().join("b.py");
        let user = dir.path().join("c.py");
        let late = dir.path().join("d.py");
        write(&generated, "# generated - DO NOT EDIT\nx = 1\n");
        write(&padded, "\n\n   # generated - DO NOT EDIT\n");
        write(&user, "x = 1\n# generated - DO NOT EDIT\n");
        write(&late, "# my notes\n");
        assert!(is_generated_file(&generated));
        assert!(is_generated_file(&padded));
        assert!(!is_generated_file(&user));
        assert!(!is_generated_file(&late));
        assert!(!is_generated_file(&dir.path().join("missing.py")));
        assert!(!is_generated_file(dir.path()));
    }

    #[test]
    fn test_dir_marker_round_trip() {
        let dir = TempDir::new().unwrap();
        assert_eq!(dir_marker_origin(dir.path()), None);
        write(
            &dir.path().join(DIR_MARKER),
            &dir_marker_contents(Path::new("/specs/shop.json")),
        );
        assert_eq!(
            dir_marker_origin(dir.path()).as_deref(),
            Some("/specs/shop.json")
        );
    }

    #[test]
    fn test_plan_and_apply_keep_user_content() {
        let root = TempDir::new().unwrap();
        let layout = OutputLayout::new(root.path(), &GenConfig::default());
        let spec = Path::new("/specs/shop.json");
        let marker = dir_marker_contents(spec);
        let gen = "# generated - DO NOT EDIT\n";

        // owned module directory with one hand-written extension
        let biz = layout.services_dir.join("biz");
        write(&biz.join(DIR_MARKER), &marker);
        write(&biz.join("widget_service.py"), gen);
        write(&biz.join("widget_service_impl.py"), "class WidgetServiceImpl: ...\n");
        // owned and fully generated
        let biz_models = layout.models_dir.join("biz");
        write(&biz_models.join(DIR_MARKER), &marker);
        write(&biz_models.join("__init__.py"), gen);
        write(&biz_models.join("widget.py"), gen);
        // unmarked user directory
        let custom = layout.models_dir.join("custom");
        write(&custom.join("thing.py"), gen);
        // another spec's directory
        let other = layout.api_dir.join("crm");
        write(&other.join(DIR_MARKER), &dir_marker_contents(Path::new("/specs/crm.json")));
        write(&other.join("lead.py"), gen);
        // shared files
        write(&layout.enums_dir.join("enums.py"), gen);
        write(&layout.api_dir.join("router.py"), "# hand-written router\n");

        let plan = plan_clean(&layout, spec).unwrap();
        assert_eq!(plan.foreign, vec![other.clone()]);
        let removed = apply_clean(&plan, false).unwrap();

        assert!(removed.contains(&layout.enums_dir.join("enums.py")));
        assert!(!layout.enums_dir.join("enums.py").exists());
        assert!(layout.api_dir.join("router.py").exists());

        assert!(!biz.join("widget_service.py").exists());
        assert!(!biz.join(DIR_MARKER).exists());
        assert!(biz.join("widget_service_impl.py").exists());

        assert!(!biz_models.exists());
        assert!(custom.join("thing.py").exists());
        assert!(other.join("lead.py").exists());
        assert!(other.join(DIR_MARKER).exists());
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let root = TempDir::new().unwrap();
        let layout = OutputLayout::new(root.path(), &GenConfig::default());
        let file = layout.schemas_dir.join("_gen_common.py");
        write(&file, "# generated - DO NOT EDIT\n");
        let plan = plan_clean(&layout, Path::new("spec.json")).unwrap();
        let removed = apply_clean(&plan, true).unwrap();
        assert_eq!(removed, vec![file.clone()]);
        assert!(file.exists());
    }
}
