// ABOUTME: The three sub-backups: database dump, model archive and config copy.
// ABOUTME: Each returns the number of bytes written and fails if its artifact is missing or empty.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::SubBackupError;
use crate::config::DatabaseBackupConfig;
use crate::runtime::{ContainerManager, exit_status};

pub const DATABASE_DUMP_FILENAME: &str = "database.sql";
pub const MODEL_ARCHIVE_FILENAME: &str = "models.tar";
pub const CONFIG_DIRNAME: &str = "config";

/// Run the dump command inside the database container and save its stdout.
pub async fn dump_database<M: ContainerManager>(
    manager: &M,
    db: &DatabaseBackupConfig,
    dest: &Path,
) -> Result<u64, SubBackupError> {
    let output = manager
        .exec(&db.service, &db.command)
        .await
        .map_err(|e| SubBackupError::Dump(e.to_string()))?;

    if !output.success() {
        return Err(SubBackupError::Dump(format!(
            "{}: {}",
            exit_status(&output.exit_code),
            output.stderr.trim()
        )));
    }

    let file = dest.join(DATABASE_DUMP_FILENAME);
    tokio::fs::write(&file, &output.stdout).await?;
    non_empty(&file).await
}

/// Archive the model directory (or single file) into `models.tar`.
pub async fn archive_models(source: &Path, dest: &Path) -> Result<u64, SubBackupError> {
    if !source.exists() {
        return Err(SubBackupError::MissingSource(source.to_path_buf()));
    }

    let source = source.to_path_buf();
    let archive = dest.join(MODEL_ARCHIVE_FILENAME);
    let target = archive.clone();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = std::fs::File::create(&target)?;
        let mut builder = tar::Builder::new(file);
        if source.is_dir() {
            builder.append_dir_all("models", &source)?;
        } else {
            let name = source
                .file_name()
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("model"));
            builder.append_path_with_name(&source, Path::new("models").join(name))?;
        }
        builder.into_inner()?.sync_all()
    })
    .await
    .map_err(|e| SubBackupError::Io(std::io::Error::other(e)))??;

    non_empty(&archive).await
}

/// Copy configuration files into `config/`, keeping relative paths.
///
/// Every listed file must exist; a partial copy counts as a failure. Two
/// different sources that land on the same name fail the copy instead of
/// overwriting each other.
pub async fn copy_config(files: &[PathBuf], dest: &Path) -> Result<u64, SubBackupError> {
    let config_dir = dest.join(CONFIG_DIRNAME);
    tokio::fs::create_dir_all(&config_dir).await?;

    let mut targets: HashMap<PathBuf, &PathBuf> = HashMap::new();
    let mut total = 0u64;
    for file in files {
        if !file.is_file() {
            return Err(SubBackupError::MissingSource(file.clone()));
        }
        let name = relative_name(file);
        if let Some(first) = targets.get(&name).copied() {
            if first == file {
                continue;
            }
            return Err(SubBackupError::NameCollision {
                first: first.clone(),
                second: file.clone(),
                name,
            });
        }
        targets.insert(name.clone(), file);
        let target = config_dir.join(&name);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        total += tokio::fs::copy(file, &target).await?;
    }

    if files.is_empty() {
        return Err(SubBackupError::Empty(config_dir));
    }
    Ok(total)
}

/// Path under `config/` for a source file. Absolute paths and paths leaving
/// the working directory collapse to their file name.
fn relative_name(file: &Path) -> PathBuf {
    let safe = file
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if safe {
        file.to_path_buf()
    } else {
        file.file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("config"))
    }
}

async fn non_empty(file: &Path) -> Result<u64, SubBackupError> {
    let len = tokio::fs::metadata(file).await?.len();
    if len == 0 {
        Err(SubBackupError::Empty(file.to_path_buf()))
    } else {
        Ok(len)
    }
}
