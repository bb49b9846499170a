// Sample page loading
// Pages live under `<static_dir>/samples/<sample>/` and are served as-is

use std::io;
use std::path::{Path, PathBuf};

pub fn page_path(static_dir: &str, sample: &str, page: &str) -> PathBuf {
    Path::new(static_dir).join("samples").join(sample).join(page)
}

/// Read a sample page; a missing page is an error of the request, not a 404
pub async fn load(static_dir: &str, sample: &str, page: &str) -> io::Result<String> {
    tokio::fs::read_to_string(page_path(static_dir, sample, page)).await
}
