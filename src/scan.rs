use ignore::{Walk, WalkBuilder};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::filter::{is_library_path, is_under_classes_root, path_to_slash};

/// Config-style files copied alongside decompiled sources.
pub const RESOURCE_EXTENSIONS: &[&str] = &[
    "properties",
    "yml",
    "yaml",
    "xml",
    "json",
    "conf",
    "config",
    "txt",
    "sql",
    "sh",
];

/// Files discovered by one walk, in walk order (sorted by file name).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub classes: Vec<PathBuf>,
    pub jars: Vec<PathBuf>,
    pub wars: Vec<PathBuf>,
    pub resources: Vec<PathBuf>,
}

impl ScanResult {
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.jars.is_empty() && self.wars.is_empty()
    }
}

/// Scans an arbitrary input directory for class, jar and war files, never
/// descending into `output_dir`.
pub fn scan_tree(root: &Path, output_dir: &Path) -> Result<ScanResult> {
    let output_abs = absolute(output_dir);
    let mut builder = walker(root);
    builder.filter_entry(move |entry| !absolute(entry.path()).starts_with(&output_abs));

    let mut result = ScanResult::default();
    for path in files(root, builder.build())? {
        match extension(&path).as_deref() {
            Some("class") => result.classes.push(path),
            Some("jar") => result.jars.push(path),
            Some("war") => result.wars.push(path),
            _ => {}
        }
    }
    Ok(result)
}

/// Scans a freshly extracted archive. Jars count only under a library root,
/// resources only under a classes root.
pub fn scan_extracted(root: &Path) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    for path in files(root, walker(root).build())? {
        let relative = path_to_slash(path.strip_prefix(root).unwrap_or(&path));
        match extension(&path).as_deref() {
            Some("class") => result.classes.push(path),
            Some("jar") => {
                if is_library_path(&relative) {
                    result.jars.push(path);
                }
            }
            Some(ext) if RESOURCE_EXTENSIONS.contains(&ext) => {
                if is_under_classes_root(&relative) {
                    result.resources.push(path);
                }
            }
            _ => {}
        }
    }
    Ok(result)
}

fn walker(root: &Path) -> WalkBuilder {
    let mut builder = WalkBuilder::new(root);
    builder
        .hidden(false)
        .ignore(false)
        .parents(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b));
    builder
}

fn files(root: &Path, walk: Walk) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in walk {
        let entry = entry.map_err(|source| Error::Scan {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            out.push(entry.into_path());
        }
    }
    Ok(out)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn scan_tree_classifies_by_extension_and_skips_output() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("app.jar"));
        touch(&root.join("legacy.WAR"));
        touch(&root.join("WEB-INF/classes/com/app/Foo.class"));
        touch(&root.join("WEB-INF/web.xml"));
        touch(&root.join("src/com/app/Foo.class"));
        touch(&root.join("src/nested.jar"));
        touch(&root.join("src2/Kept.class"));

        let result = scan_tree(root, &root.join("src")).unwrap();
        assert_eq!(result.jars, vec![root.join("app.jar")]);
        assert_eq!(result.wars, vec![root.join("legacy.WAR")]);
        assert_eq!(
            result.classes,
            vec![
                root.join("WEB-INF/classes/com/app/Foo.class"),
                root.join("src2/Kept.class"),
            ]
        );
        assert!(result.resources.is_empty());
    }

    #[test]
    fn scan_extracted_keeps_only_library_jars_and_classes_resources() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path();
        touch(&root.join("BOOT-INF/classes/application.yml"));
        touch(&root.join("BOOT-INF/classes/com/app/Main.class"));
        touch(&root.join("BOOT-INF/lib/dep.jar"));
        touch(&root.join("META-INF/maven/pom.xml"));
        touch(&root.join("tools/helper.jar"));
        touch(&root.join("org/springframework/boot/loader/JarLauncher.class"));

        let result = scan_extracted(root).unwrap();
        assert_eq!(result.jars, vec![root.join("BOOT-INF/lib/dep.jar")]);
        assert_eq!(
            result.resources,
            vec![root.join("BOOT-INF/classes/application.yml")]
        );
        assert_eq!(result.classes.len(), 2);
        assert!(result.wars.is_empty());
    }

    #[test]
    fn missing_root_is_a_scan_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = scan_extracted(&tmp.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::Scan { .. }));
    }
}
