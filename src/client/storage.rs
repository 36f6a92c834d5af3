use log::warn;
use serde_json::{ Map, Value };
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use super::ClientError;

pub const STORAGE_KEY: &str = "aiConversationId";

/// Where the chat session remembers its conversation between runs.
pub trait ConversationIdStorage: Send {
    fn load(&self) -> Option<String>;
    fn store(&mut self, conversation_id: &str) -> Result<(), ClientError>;
    fn clear(&mut self) -> Result<(), ClientError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryIdStorage {
    value: Option<String>,
}

impl MemoryIdStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(conversation_id: impl Into<String>) -> Self {
        Self { value: Some(conversation_id.into()) }
    }
}

impl ConversationIdStorage for MemoryIdStorage {
    fn load(&self) -> Option<String> {
        self.value.clone()
    }

    fn store(&mut self, conversation_id: &str) -> Result<(), ClientError> {
        self.value = Some(conversation_id.to_string());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ClientError> {
        self.value = None;
        Ok(())
    }
}

/// JSON object on disk; only the `aiConversationId` key is touched, other keys are kept.
#[derive(Debug, Clone)]
pub struct FileIdStorage {
    path: PathBuf,
}

impl FileIdStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_map(&self) -> Result<Map<String, Value>, ClientError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok(Map::new());
            }
            Err(source) => {
                return Err(ClientError::StateIo { path: self.path.display().to_string(), source });
            }
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Ok(Map::new()),
            Err(source) =>
                Err(ClientError::StateJson { path: self.path.display().to_string(), source }),
        }
    }

    fn write_map(&self, map: Map<String, Value>) -> Result<(), ClientError> {
        let body = serde_json
            ::to_string_pretty(&Value::Object(map))
            .map_err(|source| ClientError::StateJson { path: self.path.display().to_string(), source })?;
        fs::write(&self.path, body).map_err(|source| ClientError::StateIo {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl ConversationIdStorage for FileIdStorage {
    fn load(&self) -> Option<String> {
        match self.read_map() {
            Ok(map) =>
                map
                    .get(STORAGE_KEY)
                    .and_then(Value::as_str)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string),
            Err(e) => {
                warn!("Ignoring unreadable state file: {}", e);
                None
            }
        }
    }

    fn store(&mut self, conversation_id: &str) -> Result<(), ClientError> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(STORAGE_KEY.to_string(), Value::String(conversation_id.to_string()));
        self.write_map(map)
    }

    fn clear(&mut self) -> Result<(), ClientError> {
        let mut map = self.read_map().unwrap_or_default();
        if map.remove(STORAGE_KEY).is_none() {
            return Ok(());
        }
        self.write_map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn temp_state_file() -> PathBuf {
        std::env::temp_dir().join(format!("docs-assistant-{}.json", Uuid::new_v4()))
    }

    #[test]
    fn file_storage_round_trips_and_clears() {
        let path = temp_state_file();
        let mut storage = FileIdStorage::new(&path);
        assert_eq!(storage.load(), None);

        storage.store("conv-1").unwrap();
        assert_eq!(FileIdStorage::new(&path).load().as_deref(), Some("conv-1"));

        storage.clear().unwrap();
        assert_eq!(storage.load(), None);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_storage_keeps_unrelated_keys() {
        let path = temp_state_file();
        fs::write(&path, r#"{"theme":"dark"}"#).unwrap();

        let mut storage = FileIdStorage::new(&path);
        storage.store("conv-2").unwrap();

        let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved[STORAGE_KEY], "conv-2");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn corrupt_state_file_reads_as_empty() {
        let path = temp_state_file();
        fs::write(&path, "{not json").unwrap();
        assert_eq!(FileIdStorage::new(&path).load(), None);
        let _ = fs::remove_file(&path);
    }
}
