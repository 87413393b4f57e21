//! CLI command dispatch

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use modelhub_api::{ApiServer, ModelClassMap};
use modelhub_core::{registry, FileTrackingStore, ModelFacade, TrainingOrchestrator};
use modelhub_databases::SqliteCatalog;

use crate::cli::prepare_data::write_dataset;
use crate::cli::{Cli, Command, ServeArgs};
use crate::logging::{init_logging, LogSurface};
use crate::settings::Settings;

/// Run the parsed command line to completion
pub async fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;

    match cli.command() {
        Command::Serve(args) => {
            apply_overrides(&mut settings, &args);
            let _guard = init_logging(&settings.logging, surface(&args))?;
            serve(&settings, &args).await
        }
        Command::PrepareData { output, seed } => {
            let _guard = init_logging(&settings.logging, LogSurface::Combined)?;
            let rows = write_dataset(&output, seed)
                .with_context(|| format!("Failed to write dataset to {}", output.display()))?;
            println!("Dataset saved to {} ({rows} rows)", output.display());
            Ok(())
        }
        Command::Classes => {
            println!("{}", classes_json()?);
            Ok(())
        }
    }
}

fn surface(args: &ServeArgs) -> LogSurface {
    if args.rest_only {
        LogSurface::Rest
    } else if args.rpc_only {
        LogSurface::Rpc
    } else {
        LogSurface::Combined
    }
}

/// CLI flags take precedence over every configuration layer
pub fn apply_overrides(settings: &mut Settings, args: &ServeArgs) {
    if let Some(host) = &args.host {
        settings.server.host = host.clone();
    }
    if let Some(port) = args.rest_port {
        settings.server.rest_port = port;
    }
    if let Some(port) = args.rpc_port {
        settings.server.rpc_port = port;
    }
}

/// Wire the tracking store, catalog and facade from settings
pub fn build_facade(settings: &Settings) -> Result<Arc<ModelFacade>> {
    let tracking = FileTrackingStore::open(&settings.tracking.root, &settings.tracking.experiment)
        .with_context(|| {
            format!(
                "Failed to open tracking store at {}",
                settings.tracking.root.display()
            )
        })?;

    let db_path = &settings.catalog.database_path;
    ensure_parent(db_path)?;
    let catalog = SqliteCatalog::open(db_path)
        .with_context(|| format!("Failed to open model catalog {}", db_path.display()))?;

    info!(
        "Tracking runs under {} (experiment '{}'), catalog at {}",
        settings.tracking.root.display(),
        settings.tracking.experiment,
        db_path.display()
    );

    let orchestrator = TrainingOrchestrator::new(Arc::new(tracking));
    Ok(Arc::new(ModelFacade::new(orchestrator, Arc::new(catalog))))
}

async fn serve(settings: &Settings, args: &ServeArgs) -> Result<()> {
    let facade = build_facade(settings)?;
    let server = ApiServer::new(settings.server.clone(), facade);

    if args.rest_only {
        server.start_rest().await
    } else if args.rpc_only {
        server.start_rpc().await
    } else {
        server.start().await
    }
}

fn classes_json() -> Result<String> {
    let classes = ModelClassMap::from(registry::list_all());
    serde_json::to_string_pretty(&classes).context("Failed to render model classes")
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{CatalogSettings, LoggingSettings, TrackingSettings};
    use modelhub_api::ApiConfig;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            server: ApiConfig::default(),
            catalog: CatalogSettings {
                database_path: dir.path().join("db").join("models.db"),
            },
            tracking: TrackingSettings {
                root: dir.path().join("mlruns"),
                experiment: "cli".to_string(),
            },
            logging: LoggingSettings {
                directory: dir.path().join("logs"),
                level: "info".to_string(),
                json: false,
                max_files: 1,
            },
        }
    }

    #[test]
    fn test_overrides() {
        let dir = TempDir::new().unwrap();
        let mut settings = settings(&dir);
        let args = ServeArgs {
            host: Some("127.0.0.1".to_string()),
            rpc_port: Some(6000),
            ..ServeArgs::default()
        };

        apply_overrides(&mut settings, &args);

        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.rest_port, 5000);
        assert_eq!(settings.server.rpc_port, 6000);
    }

    #[test]
    fn test_surface_selection() {
        let rest = ServeArgs {
            rest_only: true,
            ..ServeArgs::default()
        };
        let rpc = ServeArgs {
            rpc_only: true,
            ..ServeArgs::default()
        };

        assert_eq!(surface(&rest), LogSurface::Rest);
        assert_eq!(surface(&rpc), LogSurface::Rpc);
        assert_eq!(surface(&ServeArgs::default()), LogSurface::Combined);
    }

    #[test]
    fn test_build_facade_creates_stores() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        let facade = build_facade(&settings).unwrap();

        assert!(facade.list().unwrap().is_empty());
        assert!(settings.catalog.database_path.exists());
        assert!(settings.tracking.root.join("cli").exists());
    }

    #[test]
    fn test_classes_json() {
        let value: serde_json::Value = serde_json::from_str(&classes_json().unwrap()).unwrap();
        assert_eq!(value["random_forest"]["class_name"], "RandomForestClassifier");
        assert_eq!(value["logistic_regression"]["description"], "Logistic Regression");
    }

    #[test]
    fn test_classes_json_keeps_registry_order() {
        let rendered = classes_json().unwrap();
        let forest = rendered.find("\"random_forest\"").unwrap();
        let logistic = rendered.find("\"logistic_regression\"").unwrap();
        assert!(forest < logistic);
    }
}
