use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::builder::{BoolishValueParser, TypedValueParser};
use clap::{CommandFactory, Parser};
use log::debug;

use crate::backfill::Stream;
use crate::error::{Error, Result};

pub const DEFAULT_OC_URL: &str = "https://share.rabe.ch";
pub const DEFAULT_OC_PATH: &str = "IT/Share/ACRCloud Data";
pub const DEFAULT_MC_URL: &str = "minio.service.int.rabe.ch:9000";
pub const DEFAULT_MC_BUCKET: &str = "acrcloud.raw";
pub const DEFAULT_MC_REGION: &str = "us-east-1";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Stores daily data from ACRCloud's broadcast monitoring service in ownCloud
/// and MinIO.
///
/// Every option can also be given as an environment variable or in a config
/// file with `KEY=VALUE` lines, using the environment variable names.
#[derive(Parser, Debug, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Config file path, read after /etc/acrloader.conf, ~/.acrloader.conf
    /// and ./acrloader.conf
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// ACRCloud bearer token
    #[arg(long, env = "ACR_BEARER_TOKEN", hide_env_values = true)]
    pub acr_bearer_token: Option<String>,

    /// ACRCloud project id
    #[arg(long, env = "ACR_PROJECT_ID")]
    pub acr_project_id: Option<String>,

    /// ACRCloud stream id
    #[arg(long, env = "ACR_STREAM_ID")]
    pub acr_stream_id: Option<String>,

    /// Store reports in ownCloud [default: true]
    #[arg(long, env = "OC_ENABLE", value_parser = BoolishValueParser::new())]
    pub oc_enable: Option<bool>,

    /// ownCloud URL
    #[arg(long, env = "OC_URL")]
    pub oc_url: Option<String>,

    /// ownCloud user
    #[arg(long, env = "OC_USER")]
    pub oc_user: Option<String>,

    /// ownCloud password
    #[arg(long, env = "OC_PASS", hide_env_values = true)]
    pub oc_pass: Option<String>,

    /// ownCloud path
    #[arg(long, env = "OC_PATH")]
    pub oc_path: Option<String>,

    /// Store reports in MinIO [default: false]
    #[arg(long, env = "MC_ENABLE", value_parser = BoolishValueParser::new())]
    pub mc_enable: Option<bool>,

    /// MinIO endpoint, host[:port]
    #[arg(long, env = "MC_URL")]
    pub mc_url: Option<String>,

    /// MinIO bucket
    #[arg(long, env = "MC_BUCKET")]
    pub mc_bucket: Option<String>,

    /// MinIO access key
    #[arg(long, env = "MC_ACCESS_KEY")]
    pub mc_access_key: Option<String>,

    /// MinIO secret key
    #[arg(long, env = "MC_SECRET_KEY", hide_env_values = true)]
    pub mc_secret_key: Option<String>,

    /// Use https to talk to MinIO [default: true]
    #[arg(long, env = "MC_SECURE", value_parser = BoolishValueParser::new())]
    pub mc_secure: Option<bool>,

    /// MinIO region
    #[arg(long, env = "MC_REGION")]
    pub mc_region: Option<String>,

    /// Timeout for every HTTP request, in seconds
    #[arg(long, env = "HTTP_TIMEOUT")]
    pub http_timeout: Option<u64>,
}

pub struct OwnCloudSettings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub path: String,
}

pub struct MinioSettings {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub secure: bool,
    pub region: String,
}

/// Fully resolved configuration of a run.
pub struct Settings {
    pub stream: Stream,
    pub bearer_token: String,
    pub owncloud: Option<OwnCloudSettings>,
    pub minio: Option<MinioSettings>,
    pub http_timeout: Duration,
}

/// Config files in the order they are read.  Later files win.
pub fn config_files(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/acrloader.conf")];
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".acrloader.conf"));
    }
    paths.push(PathBuf::from("acrloader.conf"));
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }
    paths
}

/// Read `KEY=VALUE` pairs from the config files that exist.  The explicit
/// file, if given, has to exist.
pub fn read_config_files(explicit: Option<&Path>) -> Result<HashMap<String, String>> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!("config file {} not found", path.display())));
        }
    }
    let mut values = HashMap::new();
    for path in config_files(explicit) {
        if !path.is_file() {
            continue;
        }
        debug!("reading config file {}", path.display());
        let items = dotenvy::from_path_iter(&path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        for item in items {
            let (key, value) = item
                .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;
            values.insert(key, value);
        }
    }
    Ok(values)
}

struct Resolver<'a> {
    file: &'a HashMap<String, String>,
}

impl Resolver<'_> {
    fn optional(&self, cli: &Option<String>, key: &str) -> Option<String> {
        cli.clone()
            .or_else(|| self.file.get(key).cloned())
            .filter(|v| !v.is_empty())
    }

    fn or(&self, cli: &Option<String>, key: &str, default: &str) -> String {
        self.optional(cli, key).unwrap_or_else(|| default.to_string())
    }

    fn required(&self, cli: &Option<String>, key: &str, flag: &str) -> Result<String> {
        self.optional(cli, key)
            .ok_or_else(|| Error::Config(format!("{} (or {}) is required", flag, key)))
    }

    /// Boolean from the command line or environment, else from the files.
    /// File values are parsed the way clap parses the flags, and an empty
    /// value means the default.
    fn flag(&self, cli: Option<bool>, key: &str, default: bool) -> Result<bool> {
        if let Some(value) = cli {
            return Ok(value);
        }
        match self.optional(&None, key) {
            None => Ok(default),
            Some(value) => BoolishValueParser::new()
                .parse_ref(&Args::command(), None, OsStr::new(value.trim()))
                .map_err(|_| Error::Config(format!("{} must be true or false, got {}", key, value))),
        }
    }
}

impl Settings {
    /// Combine command line and environment (`args`) with the config file
    /// values.  Credentials are only required for enabled backends.
    pub fn resolve(args: &Args, file: &HashMap<String, String>) -> Result<Settings> {
        let r = Resolver { file };

        let project_id = r.required(&args.acr_project_id, "ACR_PROJECT_ID", "--acr-project-id")?;
        let project_id = project_id.trim().parse::<i64>().map_err(|e| {
            Error::Config(format!("ACR_PROJECT_ID must be a number, got {}: {}", project_id, e))
        })?;
        let stream = Stream {
            project_id,
            stream_id: r.required(&args.acr_stream_id, "ACR_STREAM_ID", "--acr-stream-id")?,
        };
        let bearer_token =
            r.required(&args.acr_bearer_token, "ACR_BEARER_TOKEN", "--acr-bearer-token")?;

        let owncloud = if r.flag(args.oc_enable, "OC_ENABLE", true)? {
            Some(OwnCloudSettings {
                url: r.or(&args.oc_url, "OC_URL", DEFAULT_OC_URL),
                user: r.required(&args.oc_user, "OC_USER", "--oc-user")?,
                password: r.required(&args.oc_pass, "OC_PASS", "--oc-pass")?,
                path: r.or(&args.oc_path, "OC_PATH", DEFAULT_OC_PATH),
            })
        } else {
            None
        };

        let minio = if r.flag(args.mc_enable, "MC_ENABLE", false)? {
            Some(MinioSettings {
                endpoint: r.or(&args.mc_url, "MC_URL", DEFAULT_MC_URL),
                bucket: r.or(&args.mc_bucket, "MC_BUCKET", DEFAULT_MC_BUCKET),
                access_key: r.required(&args.mc_access_key, "MC_ACCESS_KEY", "--mc-access-key")?,
                secret_key: r.required(&args.mc_secret_key, "MC_SECRET_KEY", "--mc-secret-key")?,
                secure: r.flag(args.mc_secure, "MC_SECURE", true)?,
                region: r.or(&args.mc_region, "MC_REGION", DEFAULT_MC_REGION),
            })
        } else {
            None
        };

        if owncloud.is_none() && minio.is_none() {
            return Err(Error::Config(
                "enable at least one of ownCloud (OC_ENABLE) or MinIO (MC_ENABLE)".to_string(),
            ));
        }

        let timeout = match args.http_timeout {
            Some(secs) => secs,
            None => match r.optional(&None, "HTTP_TIMEOUT") {
                Some(v) => v.trim().parse::<u64>().map_err(|e| {
                    Error::Config(format!("HTTP_TIMEOUT must be a number of seconds: {}", e))
                })?,
                None => DEFAULT_HTTP_TIMEOUT_SECS,
            },
        };

        Ok(Settings {
            stream,
            bearer_token,
            owncloud,
            minio,
            http_timeout: Duration::from_secs(timeout),
        })
    }

    /// Parse the command line and environment, then read the config files.
    pub fn load() -> Result<Settings> {
        let args = Args::parse();
        let file = read_config_files(args.config.as_deref())?;
        Settings::resolve(&args, &file)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::io::Write;
    use std::result::Result;

    use super::*;

    fn file(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn acr() -> HashMap<String, String> {
        file(&[
            ("ACR_BEARER_TOKEN", "token"),
            ("ACR_PROJECT_ID", "1"),
            ("ACR_STREAM_ID", "asdf"),
            ("OC_USER", "user"),
            ("OC_PASS", "pass"),
        ])
    }

    #[test]
    fn defaults() -> Result<(), Box<dyn Error>> {
        let settings = Settings::resolve(&Args::default(), &acr())?;
        assert_eq!(settings.stream.project_id, 1);
        assert_eq!(settings.stream.stream_id, "asdf");
        let oc = settings.owncloud.ok_or("ownCloud should be enabled")?;
        assert_eq!(oc.url, "https://share.rabe.ch");
        assert_eq!(oc.path, "IT/Share/ACRCloud Data");
        assert!(settings.minio.is_none());
        assert_eq!(settings.http_timeout, Duration::from_secs(60));
        Ok(())
    }

    #[test]
    fn command_line_wins_over_file() -> Result<(), Box<dyn Error>> {
        let args = Args {
            acr_stream_id: Some("qwer".to_string()),
            oc_path: Some("/tmp/test".to_string()),
            http_timeout: Some(5),
            ..Default::default()
        };
        let settings = Settings::resolve(&args, &acr())?;
        assert_eq!(settings.stream.stream_id, "qwer");
        assert_eq!(settings.owncloud.ok_or("no ownCloud")?.path, "/tmp/test");
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn minio_needs_credentials() {
        let mut values = acr();
        values.insert("MC_ENABLE".to_string(), "true".to_string());
        let err = Settings::resolve(&Args::default(), &values).err().map(|e| e.to_string());
        assert_eq!(
            err.as_deref(),
            Some("configuration: --mc-access-key (or MC_ACCESS_KEY) is required")
        );

        values.insert("MC_ACCESS_KEY".to_string(), "minio".to_string());
        values.insert("MC_SECRET_KEY".to_string(), "minio123".to_string());
        values.insert("MC_SECURE".to_string(), "no".to_string());
        let settings = Settings::resolve(&Args::default(), &values).unwrap();
        let mc = settings.minio.unwrap();
        assert_eq!(mc.bucket, "acrcloud.raw");
        assert!(!mc.secure);
    }

    #[test]
    fn owncloud_credentials_only_when_enabled() -> Result<(), Box<dyn Error>> {
        let values = file(&[
            ("ACR_BEARER_TOKEN", "token"),
            ("ACR_PROJECT_ID", "1"),
            ("ACR_STREAM_ID", "asdf"),
            ("OC_ENABLE", "false"),
            ("MC_ENABLE", "1"),
            ("MC_ACCESS_KEY", "minio"),
            ("MC_SECRET_KEY", "minio123"),
        ]);
        let settings = Settings::resolve(&Args::default(), &values)?;
        assert!(settings.owncloud.is_none());
        assert!(settings.minio.is_some());
        Ok(())
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut values = acr();
        values.insert("ACR_PROJECT_ID".to_string(), "abc".to_string());
        assert!(Settings::resolve(&Args::default(), &values).is_err());

        let mut values = acr();
        values.insert("OC_ENABLE".to_string(), "maybe".to_string());
        assert!(Settings::resolve(&Args::default(), &values).is_err());

        let mut values = acr();
        values.insert("OC_ENABLE".to_string(), "false".to_string());
        assert!(Settings::resolve(&Args::default(), &values).is_err());

        let mut values = acr();
        values.remove("ACR_BEARER_TOKEN");
        assert!(Settings::resolve(&Args::default(), &values).is_err());
    }

    #[test]
    fn empty_flags_use_the_default() -> Result<(), Box<dyn Error>> {
        let mut values = acr();
        values.insert("OC_ENABLE".to_string(), "".to_string());
        values.insert("MC_ENABLE".to_string(), "".to_string());
        values.insert("HTTP_TIMEOUT".to_string(), "".to_string());
        let settings = Settings::resolve(&Args::default(), &values)?;
        assert!(settings.owncloud.is_some());
        assert!(settings.minio.is_none());
        assert_eq!(settings.http_timeout, Duration::from_secs(60));

        values.insert("MC_ENABLE".to_string(), "on".to_string());
        values.insert("MC_ACCESS_KEY".to_string(), "minio".to_string());
        values.insert("MC_SECRET_KEY".to_string(), "minio123".to_string());
        values.insert("MC_SECURE".to_string(), "".to_string());
        let settings = Settings::resolve(&Args::default(), &values)?;
        assert!(settings.minio.ok_or("MinIO should be enabled")?.secure);
        Ok(())
    }

    #[test]
    fn reads_explicit_config_file() -> Result<(), Box<dyn Error>> {
        let mut conf = tempfile::NamedTempFile::new()?;
        writeln!(conf, "# acrloader")?;
        writeln!(conf, "ACR_STREAM_ID=s-1234")?;
        writeln!(conf, "OC_PATH=\"IT/Share/ACRCloud Data\"")?;
        let values = read_config_files(Some(conf.path()))?;
        assert_eq!(values.get("ACR_STREAM_ID").map(String::as_str), Some("s-1234"));
        assert_eq!(values.get("OC_PATH").map(String::as_str), Some("IT/Share/ACRCloud Data"));
        Ok(())
    }

    #[test]
    fn missing_explicit_config_file() {
        assert!(read_config_files(Some(Path::new("/nonexistent/acrloader.conf"))).is_err());
    }

    #[test]
    fn config_file_order() {
        let paths = config_files(Some(Path::new("custom.conf")));
        assert_eq!(paths.first(), Some(&PathBuf::from("/etc/acrloader.conf")));
        assert_eq!(paths.last(), Some(&PathBuf::from("custom.conf")));
    }

    #[test]
    fn command_line_parsing() -> Result<(), Box<dyn Error>> {
        let args = Args::try_parse_from([
            "acrloader",
            "--acr-project-id",
            "7",
            "--mc-enable",
            "yes",
            "-c",
            "x.conf",
        ])?;
        assert_eq!(args.acr_project_id.as_deref(), Some("7"));
        assert_eq!(args.mc_enable, Some(true));
        assert_eq!(args.config, Some(PathBuf::from("x.conf")));
        Ok(())
    }
}
