//! Business-code filtering.
//!
//! Decides which class files and which library jars are in scope for a run.
//! Everything here is a pure function of a [`FilterConfig`] and a path string;
//! paths are compared in slash-separated form so the same rules apply to
//! archive entries and to files on disk.

use std::path::Path;

/// Framework package prefixes excluded unless the caller opts out.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "org/springframework/",
    "org/apache/",
    "com/fasterxml/",
    "org/hibernate/",
    "org/mybatis/",
    "ch/qos/logback/",
    "org/slf4j/",
    "com/google/",
    "javax/",
    "jakarta/",
    "org/aspectj/",
    "org/yaml/",
    "com/zaxxer/",
    "org/jboss/",
    "io/netty/",
    "com/alibaba/",
    "org/thymeleaf/",
    "org/bouncycastle/",
];

/// Roots under which an archive keeps its own compiled classes.
pub const CLASSES_ROOTS: &[&str] = &["BOOT-INF/classes/", "WEB-INF/classes/"];

/// Roots under which an archive keeps its dependency jars.
pub const LIB_ROOTS: &[&str] = &["BOOT-INF/lib", "WEB-INF/lib"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    pub includes: Vec<String>,
    pub excludes: Vec<String>,
    pub skip_libs: bool,
    pub jar_include_keywords: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::with_excludes(DEFAULT_EXCLUDES)
    }
}

impl FilterConfig {
    pub fn with_excludes(excludes: &[&str]) -> Self {
        Self {
            includes: Vec::new(),
            excludes: excludes.iter().map(|s| (*s).to_string()).collect(),
            skip_libs: true,
            jar_include_keywords: Vec::new(),
        }
    }

    /// `path` may be absolute or relative; only the part after a classes root
    /// marker (or the whole slash-normalized path) is matched.
    pub fn should_process_class(&self, path: &str) -> bool {
        let relative = class_relative_path(path);

        if !self.includes.is_empty() {
            return self
                .includes
                .iter()
                .any(|prefix| relative.starts_with(prefix.as_str()));
        }

        !self
            .excludes
            .iter()
            .any(|prefix| relative.starts_with(prefix.as_str()))
    }

    pub fn should_process_jar(&self, path: &str) -> bool {
        if !is_library_path(path) {
            return true;
        }

        let keywords_match = || {
            let name = file_name(path).to_lowercase();
            self.jar_include_keywords
                .iter()
                .any(|keyword| name.contains(&keyword.to_lowercase()))
        };

        if self.skip_libs || !self.jar_include_keywords.is_empty() {
            return keywords_match();
        }
        true
    }
}

/// Strips everything up to and including a classes root marker.
pub fn class_relative_path(path: &str) -> String {
    let normalized = to_slash(path);
    for root in CLASSES_ROOTS {
        if let Some(idx) = normalized.find(root) {
            return normalized[idx + root.len()..].to_string();
        }
    }
    normalized
}

/// Directory part of a class path after the classes root, `.` for the
/// default package.
pub fn package_path(path: &str) -> String {
    let relative = class_relative_path(path);
    match relative.rsplit_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ".".to_string(),
    }
}

/// Slash path of `path` used for class filtering. The full path is kept when
/// it contains a classes root marker, so the marker survives when `root`
/// itself sits at or below `WEB-INF`/`BOOT-INF`; otherwise the path relative
/// to `root`.
pub fn class_match_path(root: &Path, path: &Path) -> String {
    let full = path_to_slash(path);
    if CLASSES_ROOTS.iter().any(|marker| full.contains(marker)) {
        return full;
    }
    path_to_slash(path.strip_prefix(root).unwrap_or(path))
}

pub fn is_library_path(path: &str) -> bool {
    let normalized = to_slash(path);
    LIB_ROOTS.iter().any(|root| normalized.contains(root))
}

pub fn is_under_classes_root(path: &str) -> bool {
    let normalized = to_slash(path);
    CLASSES_ROOTS
        .iter()
        .any(|root| normalized.contains(root.trim_end_matches('/')))
}

pub fn path_to_slash(path: &Path) -> String {
    to_slash(&path.to_string_lossy())
}

/// Parses a comma-separated list of package prefixes given in dotted or
/// slashed notation into slash form with a trailing `/`.
pub fn parse_package_prefixes(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| {
            let mut prefix = p.replace('.', "/");
            if !prefix.ends_with('/') {
                prefix.push('/');
            }
            prefix
        })
        .collect()
}

pub fn parse_keywords(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn class_match_path_keeps_marker_above_root() {
        let root = PathBuf::from("/deploy/app/WEB-INF");
        let class = root.join("classes/com/app/Foo.class");
        let matched = class_match_path(&root, &class);
        assert_eq!(class_relative_path(&matched), "com/app/Foo.class");
        assert_eq!(package_path(&matched), "com/app");

        let plain = PathBuf::from("/deploy/out/com/app/Bar.class");
        assert_eq!(
            class_match_path(Path::new("/deploy/out"), &plain),
            "com/app/Bar.class"
        );
    }

    fn includes(prefixes: &[&str]) -> FilterConfig {
        FilterConfig {
            includes: prefixes.iter().map(|s| (*s).to_string()).collect(),
            ..FilterConfig::default()
        }
    }

    #[test]
    fn includes_override_excludes() {
        let mut cfg = includes(&["com/app/"]);
        cfg.excludes.push("com/app/".to_string());
        assert!(cfg.should_process_class("com/app/Foo.class"));
        assert!(!cfg.should_process_class("com/other/Bar.class"));
    }

    #[test]
    fn includes_can_select_a_default_excluded_package() {
        let cfg = includes(&["org/springframework/"]);
        assert!(cfg.should_process_class("org/springframework/boot/Loader.class"));
    }

    #[test]
    fn default_excludes_drop_framework_classes() {
        let cfg = FilterConfig::default();
        assert!(!cfg.should_process_class("org/springframework/boot/loader/JarLauncher.class"));
        assert!(!cfg.should_process_class("BOOT-INF/classes/javax/inject/Inject.class"));
        assert!(cfg.should_process_class("BOOT-INF/classes/com/acme/Service.class"));
    }

    #[test]
    fn classes_marker_is_stripped_before_matching() {
        let cfg = includes(&["com/app/"]);
        assert!(cfg.should_process_class("/tmp/x/WEB-INF/classes/com/app/Foo.class"));
        assert!(!cfg.should_process_class("/tmp/x/com/app/Foo.class"));
    }

    #[test]
    fn backslash_paths_are_normalized() {
        let cfg = includes(&["com/app/"]);
        assert!(cfg.should_process_class(r"BOOT-INF\classes\com\app\Foo.class"));
    }

    #[test]
    fn empty_and_garbage_paths_do_not_match_includes() {
        let cfg = includes(&["com/app/"]);
        assert!(!cfg.should_process_class(""));
        assert!(!cfg.should_process_class("\u{0}\u{1}"));
        assert!(FilterConfig::default().should_process_class(""));
    }

    #[test]
    fn non_library_jars_are_always_processed() {
        let cfg = FilterConfig::default();
        assert!(cfg.should_process_jar("/deploy/app.jar"));
    }

    #[test]
    fn skip_libs_without_keywords_skips_every_library_jar() {
        let cfg = FilterConfig::default();
        assert!(!cfg.should_process_jar("BOOT-INF/lib/acme-core-1.0.jar"));
    }

    #[test]
    fn skip_libs_with_keywords_keeps_matching_jars_case_insensitively() {
        let cfg = FilterConfig {
            jar_include_keywords: vec!["ACME".to_string()],
            ..FilterConfig::default()
        };
        assert!(cfg.should_process_jar("WEB-INF/lib/acme-core-1.0.jar"));
        assert!(!cfg.should_process_jar("WEB-INF/lib/guava-33.jar"));
    }

    #[test]
    fn keeping_libs_honours_keywords_when_present() {
        let mut cfg = FilterConfig {
            skip_libs: false,
            ..FilterConfig::default()
        };
        assert!(cfg.should_process_jar("BOOT-INF/lib/guava-33.jar"));

        cfg.jar_include_keywords = vec!["acme".to_string()];
        assert!(!cfg.should_process_jar("BOOT-INF/lib/guava-33.jar"));
        assert!(cfg.should_process_jar("BOOT-INF/lib/acme-api.jar"));
    }

    #[test]
    fn package_path_uses_classes_relative_directory() {
        assert_eq!(package_path("BOOT-INF/classes/com/app/Foo.class"), "com/app");
        assert_eq!(package_path("com/app/Foo.class"), "com/app");
        assert_eq!(package_path("Foo.class"), ".");
    }

    #[test]
    fn parse_package_prefixes_normalizes_notation() {
        assert_eq!(
            parse_package_prefixes(" com.mycompany , com/partner/,, "),
            vec!["com/mycompany/".to_string(), "com/partner/".to_string()]
        );
        assert!(parse_package_prefixes("").is_empty());
    }

    #[test]
    fn parse_keywords_drops_empty_entries() {
        assert_eq!(
            parse_keywords("myapp, ,common"),
            vec!["myapp".to_string(), "common".to_string()]
        );
    }
}
