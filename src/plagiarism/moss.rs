//! Client for the MOSS (Measure Of Software Similarity) submission protocol
//!
//! The exchange is line based over a plain TCP socket: a header of options,
//! a language check answered with `yes`/`no`, one `file` record per
//! submission followed by its raw bytes, then a `query` whose reply is the
//! report URL.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

pub const MOSS_SERVER: &str = "moss.stanford.edu:7690";

/// Languages accepted by the server
pub const LANGUAGES: &[&str] = &[
    "c", "cc", "java", "ml", "pascal", "ada", "lisp", "scheme", "haskell", "fortran", "ascii",
    "vhdl", "verilog", "perl", "matlab", "python", "mips", "prolog", "spice", "vb", "csharp",
    "modula2", "a8086", "javascript", "plsql",
];

#[derive(Error, Debug)]
pub enum MossError {
    #[error("Unsupported language '{0}'. Supported: {}", LANGUAGES.join(", "))]
    UnsupportedLanguage(String),

    #[error("Language '{0}' not accepted by the server")]
    LanguageRejected(String),

    #[error("Connection to MOSS failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("MOSS did not return a report URL: {0}")]
    InvalidResponse(String),

    #[error("Failed to download report: {0}")]
    Download(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MossOptions {
    pub user_id: String,
    pub language: String,
    /// Passages appearing in more than this many programs are ignored (`-m`)
    pub ignore_limit: u32,
    /// Attached to the report (`-c`)
    pub comment: String,
    /// Number of matching files shown (`-n`)
    pub matches_shown: u32,
    /// Submissions are directories rather than files (`-d`)
    pub directory_mode: bool,
    /// Use the experimental server (`-x`)
    pub experimental: bool,
}

impl MossOptions {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            language: "python".to_string(),
            ignore_limit: 10,
            comment: String::new(),
            matches_shown: 250,
            directory_mode: false,
            experimental: false,
        }
    }
}

/// A named file content sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub display_name: String,
    pub content: Vec<u8>,
}

impl Submission {
    pub fn new(display_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            display_name: display_name.into(),
            content,
        }
    }

    /// Name as it appears on the wire: no spaces, forward slashes only
    fn wire_name(&self) -> String {
        self.display_name.replace(' ', "_").replace('\\', "/")
    }
}

pub struct MossClient {
    server: String,
    options: MossOptions,
}

impl MossClient {
    pub fn new(options: MossOptions) -> Result<Self, MossError> {
        if !LANGUAGES.contains(&options.language.as_str()) {
            return Err(MossError::UnsupportedLanguage(options.language));
        }
        Ok(Self {
            server: MOSS_SERVER.to_string(),
            options,
        })
    }

    /// Talk to another server address (`host:port`)
    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = server.into();
        self
    }

    /// Send base files (id 0) and student files (ids from 1); returns the report URL
    pub async fn submit(&self, base: &[Submission], files: &[Submission]) -> Result<String, MossError> {
        let opts = &self.options;
        let stream = TcpStream::connect(&self.server).await?;
        let (reader, mut writer) = stream.into_split();
        let mut reader = BufReader::new(reader);

        let header = format!(
            "moss {}\ndirectory {}\nX {}\nmaxmatches {}\nshow {}\nlanguage {}\n",
            opts.user_id,
            u8::from(opts.directory_mode),
            u8::from(opts.experimental),
            opts.ignore_limit,
            opts.matches_shown,
            opts.language
        );
        writer.write_all(header.as_bytes()).await?;
        writer.flush().await?;

        let mut answer = String::new();
        reader.read_line(&mut answer).await?;
        if answer.trim() == "no" {
            let _ = writer.write_all(b"end\n").await;
            return Err(MossError::LanguageRejected(opts.language.clone()));
        }

        let numbered = base
            .iter()
            .map(|s| (0, s))
            .chain(files.iter().enumerate().map(|(i, s)| (i + 1, s)));
        for (id, submission) in numbered {
            debug!(id, name = %submission.display_name, bytes = submission.content.len(), "Uploading to MOSS");
            let record = format!(
                "file {} {} {} {}\n",
                id,
                opts.language,
                submission.content.len(),
                submission.wire_name()
            );
            writer.write_all(record.as_bytes()).await?;
            writer.write_all(&submission.content).await?;
        }

        writer
            .write_all(format!("query 0 {}\n", opts.comment).as_bytes())
            .await?;
        writer.flush().await?;

        let mut response = String::new();
        reader.read_line(&mut response).await?;
        let _ = writer.write_all(b"end\n").await;

        let url = response.trim().to_string();
        if !url.starts_with("http") {
            return Err(MossError::InvalidResponse(url));
        }
        Ok(url)
    }
}

/// `{dir}/{name}_{YYYY-mm-dd_HHMMSS}.md`
pub fn report_path(dir: &Path, name: &str, now: chrono::DateTime<chrono::Local>) -> PathBuf {
    dir.join(format!("{}_{}.md", name, now.format("%Y-%m-%d_%H%M%S")))
}

/// Download the report page to `path`
pub async fn save_report(http: &reqwest::Client, url: &str, path: &Path) -> Result<(), MossError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| MossError::Download(e.to_string()))?;
    if !response.status().is_success() {
        return Err(MossError::Download(format!("{} returned {}", url, response.status())));
    }
    let body = response
        .bytes()
        .await
        .map_err(|e| MossError::Download(e.to_string()))?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &body).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_rejects_unknown_language() {
        let mut options = MossOptions::new("123");
        options.language = "rust".to_string();
        assert!(matches!(
            MossClient::new(options),
            Err(MossError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn test_wire_name_replaces_spaces() {
        let submission = Submission::new("hw1 alice\\main.py", Vec::new());
        assert_eq!(submission.wire_name(), "hw1_alice/main.py");
    }

    #[test]
    fn test_report_path_format() {
        let now = chrono::Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();
        let path = report_path(Path::new("moss_reports"), "tp1", now);
        assert_eq!(path, Path::new("moss_reports/tp1_2024-03-05_140709.md"));
    }
}
