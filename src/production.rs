//! Output file naming conventions.
use std::path::{Path, PathBuf};

/// Archive file path: the caller provided base name, upper cased.
pub fn archive_path(path: &Path) -> PathBuf {
    match path.file_name().and_then(|name| name.to_str()) {
        Some(name) => path.with_file_name(name.to_uppercase()),
        None => path.to_path_buf(),
    }
}

/// Yearly K summary: `<STATION><yy>K.DKA`, next to the archive.
pub fn k_summary_path(dir: &Path, station: &str, year: i32) -> PathBuf {
    dir.join(format!("{}{:02}K.DKA", station.to_uppercase(), year % 100))
}

/// One time station README: `README.<STATION>`, next to the archive.
pub fn readme_path(dir: &Path, station: &str) -> PathBuf {
    dir.join(format!("README.{}", station.to_uppercase()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn naming_conventions() {
        assert_eq!(
            archive_path(Path::new("/tmp/out/aaa10mar.bin")),
            PathBuf::from("/tmp/out/AAA10MAR.BIN")
        );
        assert_eq!(
            k_summary_path(Path::new("/tmp/out"), "aaa", 2010),
            PathBuf::from("/tmp/out/AAA10K.DKA")
        );
        assert_eq!(
            readme_path(Path::new("/tmp/out"), "aaa"),
            PathBuf::from("/tmp/out/README.AAA")
        );
    }
}
