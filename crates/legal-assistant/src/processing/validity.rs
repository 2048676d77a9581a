use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

/// `<name>_<four-digit year>` searched anywhere in the file stem.
static VERSIONED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.+?)_(\d{4})").expect("versioned name regex is valid"));

const SUPPORTED_EXTENSIONS: &[&str] = &["docx", "txt", "md"];

/// List the supported law files in `dir` (non-recursive) and keep only the
/// newest year per law name. Files without a `_<year>` suffix are always kept.
pub fn filter_valid_laws(dir: &Path) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| is_supported(path))
        .collect();
    candidates.sort();

    let selected = select_latest(candidates.iter().map(PathBuf::as_path));
    tracing::info!(
        dir = %dir.display(),
        listed = candidates.len(),
        selected = selected.len(),
        "Filtered law documents by validity"
    );
    selected
}

/// Keep the highest-year path per law name; ties keep the first one seen.
/// Unversioned paths come first in input order, then one winner per name in
/// order of first appearance.
pub fn select_latest<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<PathBuf> {
    let mut unversioned: Vec<PathBuf> = Vec::new();
    let mut latest: HashMap<String, (u32, PathBuf)> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let Some(caps) = VERSIONED_NAME_RE.captures(stem) else {
            unversioned.push(path.to_path_buf());
            continue;
        };
        let name = caps[1].to_string();
        let Ok(year) = caps[2].parse::<u32>() else {
            continue;
        };

        match latest.get_mut(&name) {
            Some(current) if year > current.0 => *current = (year, path.to_path_buf()),
            Some(_) => {}
            None => {
                order.push(name.clone());
                latest.insert(name, (year, path.to_path_buf()));
            }
        }
    }

    unversioned.extend(
        order
            .into_iter()
            .filter_map(|name| latest.remove(&name).map(|(_, path)| path)),
    );
    unversioned
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        let mut out: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        out.sort();
        out
    }

    #[test]
    fn test_newest_year_wins_and_unversioned_kept() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["LuatA_2019.docx", "LuatA_2022.docx", "LuatB.docx", "ThongTu_2021.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let selected = filter_valid_laws(dir.path());
        assert_eq!(
            names(&selected),
            vec!["LuatA_2022.docx", "LuatB.docx", "ThongTu_2021.txt"]
        );
    }

    #[test]
    fn test_unsupported_extensions_and_subdirs_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("LuatC_2020.pdf"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("old")).unwrap();
        std::fs::write(dir.path().join("old").join("LuatD_2020.docx"), b"x").unwrap();

        assert!(filter_valid_laws(dir.path()).is_empty());
    }

    #[test]
    fn test_year_tie_keeps_first_seen() {
        let paths = [Path::new("LuatA_2020.docx"), Path::new("LuatA_2020.txt")];
        assert_eq!(select_latest(paths), vec![PathBuf::from("LuatA_2020.docx")]);
    }

    #[test]
    fn test_unversioned_listed_before_versioned() {
        let paths = [
            Path::new("LuatA_2019.txt"),
            Path::new("HuongDan.txt"),
            Path::new("LuatA_2021.txt"),
        ];
        assert_eq!(
            select_latest(paths),
            vec![PathBuf::from("HuongDan.txt"), PathBuf::from("LuatA_2021.txt")]
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        assert!(filter_valid_laws(Path::new("/nonexistent/laws/dir")).is_empty());
    }
}
