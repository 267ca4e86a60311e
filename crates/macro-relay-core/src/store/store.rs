//! Flat-file macro persistence.
//!
//! Each macro is two JSON files in the store directory: `<id>.json` holds
//! the metadata and `<id>.commands.json` holds the command list.

use crate::{Command, CoreError, CoreResult, Macro, MacroSummary, macro_id_from_name};

use std::{
    fs,
    io::Write,
    panic::Location,
    path::{Path, PathBuf},
};

use error_location::ErrorLocation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

const METADATA_SUFFIX: &str = ".json";
const COMMANDS_SUFFIX: &str = ".commands.json";

#[derive(Debug, Serialize, Deserialize)]
struct MetadataUnit {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_repeat")]
    repeat: u32,
    #[serde(default)]
    position: i64,
    #[serde(default)]
    timing: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CommandsUnit<T> {
    commands: Vec<T>,
}

fn default_repeat() -> u32 {
    1
}

/// Directory-backed macro store.
#[derive(Debug, Clone)]
pub struct MacroStore {
    root: PathBuf,
}

impl MacroStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    #[track_caller]
    #[instrument(skip(root))]
    pub fn open<P: AsRef<Path>>(root: P) -> CoreResult<Self> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            fs::create_dir_all(&root)?;
            debug!(root = ?root, "Created macro directory");
        }

        Ok(Self { root })
    }

    /// Directory holding the macro files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Persist both units of `macro_def`.
    ///
    /// Returns `Ok(false)` without writing when the macro already exists and
    /// `overwrite` is false.
    #[track_caller]
    #[instrument(skip(self, macro_def), fields(macro_id = %macro_def.id()))]
    pub fn save(&self, macro_def: &Macro, overwrite: bool) -> CoreResult<bool> {
        let id = checked_id(macro_def)?;
        let metadata_path = self.metadata_path(id);

        if metadata_path.exists() && !overwrite {
            warn!(path = ?metadata_path, "Macro already exists, not overwriting");
            return Ok(false);
        }

        let commands = CommandsUnit {
            commands: macro_def
                .commands
                .iter()
                .map(Command::to_record)
                .collect(),
        };

        write_json(&metadata_path, &metadata_of(macro_def))?;
        write_json(&self.commands_path(id), &commands)?;

        info!(command_count = macro_def.commands.len(), "Macro saved");

        Ok(true)
    }

    /// Rewrite only the metadata unit, leaving commands untouched.
    #[track_caller]
    #[instrument(skip(self, macro_def), fields(macro_id = %macro_def.id()))]
    pub fn save_metadata(&self, macro_def: &Macro) -> CoreResult<()> {
        let id = checked_id(macro_def)?;
        write_json(&self.metadata_path(id), &metadata_of(macro_def))?;
        debug!("Macro metadata saved");
        Ok(())
    }

    /// Load a macro and all of its decodable commands.
    ///
    /// Commands with an unknown kind or malformed fields are logged and
    /// skipped; the rest of the sequence is kept.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn load(&self, id: &str) -> CoreResult<Macro> {
        if id.is_empty() || macro_id_from_name(id) != id {
            warn!("Rejected macro id with unsafe characters");
            return Err(CoreError::NotFound {
                id: id.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let metadata_path = self.metadata_path(id);
        let commands_path = self.commands_path(id);

        if !metadata_path.is_file() || !commands_path.is_file() {
            warn!(path = ?metadata_path, "Macro files not found");
            return Err(CoreError::NotFound {
                id: id.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let metadata: MetadataUnit = read_json(&metadata_path)?;
        let unit: CommandsUnit<Value> = read_json(&commands_path)?;

        let mut commands = Vec::with_capacity(unit.commands.len());
        for (index, record) in unit.commands.into_iter().enumerate() {
            match Command::from_json(record) {
                Ok(command) => commands.push(command),
                Err(e) => warn!(index, error = %e, "Skipping undecodable command"),
            }
        }

        let mut macro_def = Macro::new(
            metadata.name,
            metadata.description,
            commands,
            metadata.repeat,
            metadata.position,
            metadata.timing,
        );
        macro_def.id = id.to_string();

        debug!(command_count = macro_def.commands.len(), "Macro loaded");

        Ok(macro_def)
    }

    /// Metadata of every readable macro, ordered by position.
    ///
    /// Unreadable or corrupt metadata files are logged and skipped.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn list_all(&self) -> CoreResult<Vec<MacroSummary>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Could not read directory entry");
                    continue;
                }
            };

            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(macro_id) = metadata_stem(&file_name) else {
                continue;
            };

            match read_json::<MetadataUnit>(&entry.path()) {
                Ok(metadata) => summaries.push(MacroSummary {
                    name: metadata.name,
                    description: metadata.description,
                    position: metadata.position,
                    repeat: metadata.repeat.max(1),
                    macro_id: macro_id.to_string(),
                    timing: metadata.timing,
                }),
                Err(e) => warn!(file = %file_name, error = %e, "Could not read macro file"),
            }
        }

        summaries.sort_by_key(|s| s.position);

        Ok(summaries)
    }

    /// Remove both units of a macro. Missing files are ignored.
    #[track_caller]
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> CoreResult<()> {
        for path in [self.metadata_path(id), self.commands_path(id)] {
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        info!(macro_id = %id, "Macro deleted");
        Ok(())
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, METADATA_SUFFIX))
    }

    fn commands_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, COMMANDS_SUFFIX))
    }
}

fn metadata_stem(file_name: &str) -> Option<&str> {
    if file_name.ends_with(COMMANDS_SUFFIX) {
        return None;
    }
    file_name
        .strip_suffix(METADATA_SUFFIX)
        .filter(|stem| !stem.is_empty())
}

fn metadata_of(macro_def: &Macro) -> MetadataUnit {
    MetadataUnit {
        name: macro_def.name().to_string(),
        description: macro_def.description.clone(),
        repeat: macro_def.repeat(),
        position: macro_def.position,
        timing: macro_def.timing,
    }
}

#[track_caller]
fn checked_id(macro_def: &Macro) -> CoreResult<&str> {
    let id = macro_def.id();
    if id.is_empty() {
        return Err(CoreError::Malformed {
            reason: format!("Macro name {:?} yields an empty id", macro_def.name()),
            location: ErrorLocation::from(Location::caller()),
        });
    }
    Ok(id)
}

#[track_caller]
fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> CoreResult<T> {
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CoreError::Malformed {
        reason: format!("Failed to parse {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })
}

/// Write to a temp file, sync, then rename over the target.
#[track_caller]
fn write_json<T: Serialize>(path: &Path, value: &T) -> CoreResult<()> {
    let contents = serde_json::to_string(value).map_err(|e| CoreError::Malformed {
        reason: format!("Failed to serialize {:?}: {}", path, e),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let temp_path = path.with_extension("json.tmp");

    let mut temp_file = fs::File::create(&temp_path)?;
    temp_file.write_all(contents.as_bytes())?;
    temp_file.sync_all()?;

    fs::rename(&temp_path, path)?;

    Ok(())
}
