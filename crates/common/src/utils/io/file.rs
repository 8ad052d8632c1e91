use std::{
    env,
    fs::File,
    io::{Read, Write},
    path::Path,
};

use eyre::Result;

/// Convert a long path to a short path.
///
/// ```no_run
/// use slotwatch_common::utils::io::file::short_path;
///
/// let path = "/some/long/path/that/is/cwd/something.json";
/// let short_path = short_path(path);
/// assert_eq!(short_path, "./something.json");
/// ```
pub fn short_path(path: &str) -> String {
    match env::current_dir() {
        Ok(dir) => path.replace(&dir.into_os_string().into_string().unwrap_or_default(), "."),
        Err(_) => path.to_owned(),
    }
}

/// Write contents to a file on the disc, creating parent directories as needed.
///
/// ```no_run
/// use slotwatch_common::utils::io::file::write_file;
///
/// let path = "/tmp/test.txt";
/// let contents = "Hello, World!";
/// let result = write_file(path, contents);
/// ```
pub fn write_file(path_str: &str, contents: &str) -> Result<()> {
    let path = Path::new(path_str);

    // Create the directory if it doesn't exist
    std::fs::create_dir_all(
        path.parent().ok_or_else(|| eyre::eyre!("unable to create directory"))?,
    )?;

    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;

    Ok(())
}

/// Read contents from a file on the disc
///
/// ```no_run
/// use slotwatch_common::utils::io::file::read_file;
///
/// let path = "/tmp/test.txt";
/// let contents = read_file(path);
/// ```
pub fn read_file(path: &str) -> Result<String> {
    let path = Path::new(path);
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

/// Delete a file or directory from the disc. Returns `true` if nothing remains at `path`.
///
/// ```no_run
/// use slotwatch_common::utils::io::file::delete_path;
///
/// let path = "/tmp/test.txt";
/// let result = delete_path(path);
/// ```
pub fn delete_path(path: &str) -> bool {
    let path = Path::new(path);
    let result = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else if path.exists() {
        std::fs::remove_file(path)
    } else {
        Ok(())
    };

    result.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let path = dir.path().join("nested/report.json");
        let path = path.to_str().expect("utf-8 path");

        write_file(path, "Hello, World!").expect("unable to write file");

        assert_eq!(read_file(path).expect("unable to read file"), "Hello, World!");
    }

    #[test]
    fn test_read_file_failure() {
        let path = "/nonexistent/test2.txt";
        let result = read_file(path);
        assert!(result.is_err());
    }

    #[test]
    fn test_delete_path() {
        let dir = tempfile::tempdir().expect("unable to create temp dir");
        let nested = dir.path().join("to_delete");
        std::fs::create_dir(&nested).expect("unable to create directory");

        assert!(delete_path(nested.to_str().expect("utf-8 path")));
        assert!(!nested.exists());
    }

    #[test]
    fn test_delete_missing_path() {
        assert!(delete_path("/nonexistent/test_dir2"));
    }
}
