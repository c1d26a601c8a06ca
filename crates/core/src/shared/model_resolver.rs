use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::shared::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("failed to create cache directory: {0}")]
    CacheDir(#[source] std::io::Error),
    #[error("download failed for {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to write model to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Progress callback: `(bytes_downloaded, total_bytes)`.
/// `total_bytes` is 0 if the server didn't provide Content-Length.
pub type ProgressFn = Box<dyn Fn(u64, u64) + Send>;

/// Resolve the detection model by name: user cache, then bundled dir, then
/// download into the cache.
pub fn resolve(
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    resolve_in(&model_cache_dir()?, name, url, bundled_dir, progress)
}

fn resolve_in(
    cache_dir: &Path,
    name: &str,
    url: &str,
    bundled_dir: Option<&Path>,
    progress: Option<ProgressFn>,
) -> Result<PathBuf, ModelResolveError> {
    let cached_path = cache_dir.join(name);
    if cached_path.exists() {
        log::debug!("Model found in cache: {}", cached_path.display());
        return Ok(cached_path);
    }

    if let Some(dir) = bundled_dir {
        let bundled_path = dir.join(name);
        if bundled_path.exists() {
            log::debug!("Model found in bundle: {}", bundled_path.display());
            return Ok(bundled_path);
        }
    }

    fs::create_dir_all(cache_dir).map_err(ModelResolveError::CacheDir)?;
    log::info!("Downloading {name} from {url}");
    download(url, &cached_path, progress)?;
    Ok(cached_path)
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/FaceCam/models/`
/// - Linux: `$XDG_CACHE_HOME/FaceCam/models/` or `~/.cache/FaceCam/models/`
/// - Windows: `%LOCALAPPDATA%/FaceCam/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

fn download(url: &str, dest: &Path, progress: Option<ProgressFn>) -> Result<(), ModelResolveError> {
    let temp_path = dest.with_extension("part");
    let result = download_to(url, dest, &temp_path, progress);
    if result.is_err() {
        let _ = fs::remove_file(&temp_path);
    }
    result
}

fn download_to(
    url: &str,
    dest: &Path,
    temp_path: &Path,
    progress: Option<ProgressFn>,
) -> Result<(), ModelResolveError> {
    let write_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ModelResolveError::Write { path, source }
    };

    let mut response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| ModelResolveError::Download {
            url: url.to_string(),
            source: e,
        })?;

    let total = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;
    let mut file = fs::File::create(temp_path).map_err(write_err(temp_path))?;

    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = response.read(&mut buf).map_err(write_err(temp_path))?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n]).map_err(write_err(temp_path))?;
        downloaded += n as u64;
        if let Some(ref cb) = progress {
            cb(downloaded, total);
        }
    }

    file.flush().map_err(write_err(temp_path))?;
    drop(file);

    fs::rename(temp_path, dest).map_err(write_err(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Serves exactly one HTTP response on a loopback port.
    fn serve_once(status: &'static str, body: &'static [u8]) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let head = format!(
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                body.len()
            );
            stream.write_all(head.as_bytes()).unwrap();
            stream.write_all(body).unwrap();
        });
        format!("http://{addr}/model.onnx")
    }

    #[test]
    fn test_resolve_prefers_cached_file() {
        let tmp = TempDir::new().unwrap();
        let cached = tmp.path().join("m.onnx");
        fs::write(&cached, b"cached").unwrap();

        let path = resolve_in(tmp.path(), "m.onnx", "http://127.0.0.1:9/never", None, None)
            .unwrap();
        assert_eq!(path, cached);
    }

    #[test]
    fn test_resolve_falls_back_to_bundled_file() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let bundled = tmp.path().join("bundled");
        fs::create_dir_all(&bundled).unwrap();
        fs::write(bundled.join("m.onnx"), b"bundled").unwrap();

        let path = resolve_in(&cache, "m.onnx", "http://127.0.0.1:9/never", Some(&bundled), None)
            .unwrap();
        assert_eq!(path, bundled.join("m.onnx"));
    }

    #[test]
    fn test_resolve_downloads_into_cache() {
        let tmp = TempDir::new().unwrap();
        let cache = tmp.path().join("cache");
        let url = serve_once("200 OK", b"model bytes");

        let flag = Arc::new(AtomicBool::new(false));
        let seen = flag.clone();
        let path = resolve_in(
            &cache,
            "m.onnx",
            &url,
            None,
            Some(Box::new(move |downloaded, total| {
                assert!(downloaded <= total);
                seen.store(true, Ordering::Relaxed);
            })),
        )
        .unwrap();

        assert_eq!(path, cache.join("m.onnx"));
        assert_eq!(fs::read(&path).unwrap(), b"model bytes");
        assert!(flag.load(Ordering::Relaxed));
    }

    #[test]
    fn test_download_http_error_leaves_no_partial_file() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("m.onnx");
        let url = serve_once("404 Not Found", b"");

        let result = download(&url, &dest, None);
        assert!(matches!(result, Err(ModelResolveError::Download { .. })));
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn test_model_cache_dir_uses_app_name() {
        let path = model_cache_dir().unwrap();
        assert!(path.to_string_lossy().contains(APP_DIR_NAME));
        assert!(path.ends_with("models"));
    }
}
