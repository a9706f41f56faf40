use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libvolume::backend::snapshot::SnapshotCluster;
use libvolume::{ProviderResolver, ResolverConfig, TieBreak, VolumeBestRequest};
use serde_json::{Value, json};
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "rkvol")]
#[command(
    about = "Inspect volume providers and best-fit decisions from a cluster snapshot",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    /// Storage-class snapshot file (YAML, or JSON with a .json extension)
    #[arg(short, long, value_name = "FILE", global = true, env = "RKVOL_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Tie-break policy among matching providers: `name` or `scan`
    #[arg(long, value_name = "POLICY", global = true)]
    pub tie_break: Option<TieBreak>,

    /// Volume type suggested when no provider matches
    #[arg(long, value_name = "TYPE", global = true)]
    pub fallback_type: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the provider catalog
    Providers {
        /// Only list this provider kind, e.g. `aws-ebs`
        #[arg(short, long, value_name = "KIND")]
        kind: Option<String>,
    },
    /// Decide whether a volume type can serve an access mode
    Best {
        /// Requested volume type
        #[arg(short = 't', long, value_name = "TYPE")]
        volume_type: String,

        /// Requested access mode: RWO, ROX, RWX or RWOP
        #[arg(short, long, value_name = "MODE")]
        access_mode: String,

        /// Also print every matching provider in tie-break order
        #[arg(long)]
        explain: bool,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied.
    pub fn resolver_config(&self) -> Result<ResolverConfig> {
        let mut config = ResolverConfig::from_env().context("invalid resolver environment")?;
        if let Some(tie_break) = self.tie_break {
            config.tie_break = tie_break;
        }
        if let Some(fallback) = &self.fallback_type {
            config.fallback_volume_type = fallback.clone();
        }
        Ok(config)
    }
}

/// Execute the parsed command and return its JSON output.
pub async fn run(cli: Cli) -> Result<Value> {
    let config = cli.resolver_config()?;
    let snapshot = cli
        .snapshot
        .clone()
        .context("no snapshot file given, pass --snapshot or set RKVOL_SNAPSHOT")?;
    debug!(path = %snapshot.display(), ?config, "using cluster snapshot");
    let resolver = ProviderResolver::new(Arc::new(SnapshotCluster::new(snapshot)), config);

    match cli.command {
        Commands::Providers { kind } => {
            let providers = resolver
                .list_providers(kind.as_deref())
                .await
                .context("failed to list volume providers")?;
            Ok(serde_json::to_value(providers)?)
        }
        Commands::Best {
            volume_type,
            access_mode,
            explain,
        } => {
            let request = VolumeBestRequest {
                volume_type,
                access_mode,
            };
            let decision = resolver
                .select_best(&request)
                .await
                .with_context(|| format!("failed to resolve volume type {}", request.volume_type))?;
            if !explain {
                return Ok(serde_json::to_value(decision)?);
            }
            let candidates = resolver
                .matching_providers(&request)
                .await
                .context("failed to list matching providers")?;
            Ok(json!({
                "decision": decision,
                "tie_break": resolver.config().tie_break,
                "candidates": candidates,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
storage_classes:
  - name: zz-ebs
    provisioner: ebs.csi.aws.com
  - name: aa-ebs
    provisioner: kubernetes.io/aws-ebs
  - name: nas
    provisioner: alicloud/nas
"#;

    fn snapshot_file() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, SNAPSHOT).unwrap();
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "rkvol", "best", "-t", "aws-ebs", "-a", "RWX", "--tie-break", "scan", "-s", "c.yaml",
        ])
        .unwrap();
        assert_eq!(cli.tie_break, Some(TieBreak::ScanOrder));
        assert_eq!(cli.snapshot, Some(PathBuf::from("c.yaml")));
        assert!(matches!(cli.command, Commands::Best { explain: false, .. }));
    }

    #[test]
    fn rejects_unknown_tie_break() {
        assert!(Cli::try_parse_from(["rkvol", "providers", "--tie-break", "random"]).is_err());
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from(["rkvol", "providers", "--fallback-type", "local"]).unwrap();
        let config = cli.resolver_config().unwrap();
        assert_eq!(config.fallback_volume_type, "local");
    }

    #[tokio::test]
    async fn providers_lists_catalog() {
        let (_dir, path) = snapshot_file();
        let cli =
            Cli::try_parse_from(["rkvol", "providers", "-k", "aws-ebs", "-s", &path]).unwrap();
        let out = run(cli).await.unwrap();
        let providers = out.as_array().unwrap();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0]["kind"], "aws-ebs");
        assert_eq!(providers[0]["provisioner"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn best_falls_back_and_explains() {
        let (_dir, path) = snapshot_file();
        let cli = Cli::try_parse_from([
            "rkvol", "best", "-t", "aws-ebs", "-a", "RWX", "--fallback-type", "share-file", "-s",
            &path,
        ])
        .unwrap();
        let out = run(cli).await.unwrap();
        assert_eq!(out, json!({"changed": true, "volume_type": "share-file"}));

        let cli = Cli::try_parse_from([
            "rkvol", "best", "-t", "aws-ebs", "-a", "RWO", "--explain", "--tie-break", "name",
            "-s", &path,
        ])
        .unwrap();
        let out = run(cli).await.unwrap();
        assert_eq!(out["decision"]["changed"], false);
        assert_eq!(out["candidates"][0]["name"], "aa-ebs");
        assert_eq!(out["candidates"][1]["name"], "zz-ebs");
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error() {
        let cli = Cli::try_parse_from([
            "rkvol", "providers", "-s", "/nonexistent/rkvol/cluster.yaml",
        ])
        .unwrap();
        let err = run(cli).await.unwrap_err();
        assert!(format!("{err:#}").contains("failed to list volume providers"));
    }
}
