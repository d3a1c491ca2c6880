//! # TestingBot tunnel adapter.
//!
//! The TestingBot tunnel ships as a jar and is launched through `java` from
//! `PATH`. Readiness is file-signalled: the jar touches a marker file once
//! the tunnel is connected, which we poll for. While the remote session is
//! negotiating, the jar repeats its `INFO:` status line on stderr; those are
//! deduplicated into `Info` events.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::{Host, TestingBotConfig, TunnelConfig};
use crate::error::TunnelError;
use crate::process::{OutputLine, OutputSource};
use crate::providers::provider::{LaunchPlan, LineScanner, Provider, ReadinessProbe, Scan};

const DOWNLOAD_URL: &str = "http://testingbot.com/downloads/testingbot-tunnel.zip";
const JAR_NAME: &str = "testingbot-tunnel.jar";

/// TestingBot tunnel adapter.
#[derive(Debug)]
pub struct TestingBot {
    cfg: TestingBotConfig,
}

impl TestingBot {
    pub fn new(cfg: TestingBotConfig) -> Self {
        Self { cfg }
    }

    /// Marker file the jar touches once connected. The time-based suffix
    /// keeps concurrent runs from racing on the same path.
    fn ready_file() -> PathBuf {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        std::env::temp_dir().join(format!("testingbot-{millis}"))
    }
}

impl Provider for TestingBot {
    fn name(&self) -> &'static str {
        "testingbot"
    }

    fn artifact(&self, _host: &Host) -> Option<PathBuf> {
        Some(PathBuf::from(JAR_NAME))
    }

    /// The jar runs under whatever `java` is on `PATH`; the jar itself is
    /// the downloaded artifact.
    fn command(&self, _dir: &Path, _host: &Host) -> Option<PathBuf> {
        Some(PathBuf::from("java"))
    }

    /// One platform-independent archive for every host.
    fn download_url(&self, _host: &Host) -> Result<Option<String>, TunnelError> {
        Ok(Some(DOWNLOAD_URL.to_string()))
    }

    fn plan(&self, cfg: &TunnelConfig) -> Result<LaunchPlan, TunnelError> {
        if self.cfg.api_key.is_empty() || self.cfg.api_secret.is_empty() {
            return Err(TunnelError::InvalidConfig {
                message: "testingbot api key and secret are required".into(),
            });
        }

        let ready_file = Self::ready_file();
        let mut args = vec![
            "-jar".to_string(),
            JAR_NAME.to_string(),
            self.cfg.api_key.clone(),
            self.cfg.api_secret.clone(),
            "-P".to_string(),
            cfg.port.to_string(),
            "-f".to_string(),
            ready_file.display().to_string(),
        ];

        if !self.cfg.skip_domains.is_empty() {
            args.push("-F".into());
            args.push(self.cfg.skip_domains.join(","));
        }
        if self.cfg.bypass_proxy {
            args.push("-q".into());
        }
        if self.cfg.use_compression {
            args.push("-b".into());
        }
        if self.cfg.use_ssl {
            args.push("-s".into());
        }
        if cfg.verbose {
            args.push("--debug".into());
        }

        Ok(LaunchPlan {
            args,
            probe: ReadinessProbe::MarkerFile {
                path: ready_file,
                interval: cfg.poll_interval(),
            },
            scanner: Some(Box::new(InfoDedup::default())),
        })
    }
}

/// Collapses consecutive identical `INFO: ` stderr lines into single `Info`
/// events.
#[derive(Debug, Default)]
struct InfoDedup {
    last: Option<String>,
}

impl LineScanner for InfoDedup {
    fn scan(&mut self, line: &OutputLine) -> Scan {
        if line.source != OutputSource::Stderr {
            return Scan::Pending;
        }
        let Some(message) = line.text.strip_prefix("INFO: ") else {
            return Scan::Pending;
        };
        if self.last.as_deref() == Some(message) {
            return Scan::Pending;
        }
        self.last = Some(message.to_string());
        Scan::Info(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> TestingBot {
        TestingBot::new(TestingBotConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            ..TestingBotConfig::default()
        })
    }

    #[test]
    fn args_lead_with_jar_credentials_port_and_ready_file() {
        let plan = provider().plan(&TunnelConfig::default()).unwrap();
        assert_eq!(&plan.args[..6], &["-jar", JAR_NAME, "k", "s", "-P", "4444"]);
        assert_eq!(plan.args[6], "-f");

        let ReadinessProbe::MarkerFile { path, .. } = plan.probe else {
            panic!("expected marker-file probe");
        };
        assert_eq!(plan.args[7], path.display().to_string());
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("testingbot-"), "got {file_name}");
    }

    #[test]
    fn toggles_append_their_flags_in_order() {
        let tb = TestingBot::new(TestingBotConfig {
            api_key: "k".into(),
            api_secret: "s".into(),
            use_compression: true,
            use_ssl: true,
            bypass_proxy: true,
            skip_domains: vec!["a.test".into(), "b.test".into()],
        });
        let cfg = TunnelConfig {
            verbose: true,
            ..TunnelConfig::default()
        };
        let args = tb.plan(&cfg).unwrap().args;
        assert_eq!(
            &args[8..],
            &["-F", "a.test,b.test", "-q", "-b", "-s", "--debug"]
        );
    }

    #[test]
    fn missing_credentials_are_rejected_at_plan_time() {
        let tb = TestingBot::new(TestingBotConfig::default());
        let err = tb.plan(&TunnelConfig::default()).unwrap_err();
        assert_eq!(err.as_label(), "invalid_config");
    }

    #[test]
    fn info_lines_are_deduplicated_until_the_message_changes() {
        let mut dedup = InfoDedup::default();
        let stderr = |text: &str| OutputLine {
            source: OutputSource::Stderr,
            text: text.to_string(),
        };

        assert_eq!(dedup.scan(&stderr("INFO: waiting")), Scan::Info("waiting".into()));
        assert_eq!(dedup.scan(&stderr("INFO: waiting")), Scan::Pending);
        assert_eq!(
            dedup.scan(&stderr("INFO: tunnel ready")),
            Scan::Info("tunnel ready".into())
        );
        // a repeat of an older message after a different one is forwarded again
        assert_eq!(dedup.scan(&stderr("INFO: waiting")), Scan::Info("waiting".into()));
    }

    #[test]
    fn non_info_stderr_and_stdout_lines_pass_through_silently() {
        let mut dedup = InfoDedup::default();
        assert_eq!(
            dedup.scan(&OutputLine {
                source: OutputSource::Stderr,
                text: "plain noise".into()
            }),
            Scan::Pending
        );
        assert_eq!(
            dedup.scan(&OutputLine {
                source: OutputSource::Stdout,
                text: "INFO: waiting".into()
            }),
            Scan::Pending
        );
    }
}
