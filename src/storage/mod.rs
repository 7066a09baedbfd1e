use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::chains::default_rpc_configs;
use crate::config::Config;
use crate::constants::{KEY_RPC_CONFIGS, KEY_SELECTED_FILE, KEY_WALLETS, KEY_WALLET_FILES};
use crate::error::{AppError, Result};
use crate::models::{RpcConfig, Wallet, WalletFile};

/// String key-value persistence.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

// ==================== BACKENDS ====================
/// Process-local store, used in tests and when no Redis is configured.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

pub struct RedisStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = redis::aio::ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

// ==================== TYPED STORAGE ====================
/// JSON documents under fixed keys: saved wallets, RPC overrides, stored
/// wallet files and the file handed over to the check view.
///
/// Every write goes through `write_lock`, so read-modify-write sequences from
/// concurrent requests in this process never interleave.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    max_file_wallets: usize,
    write_lock: Arc<Mutex<()>>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>, max_file_wallets: usize) -> Self {
        Self {
            store,
            max_file_wallets,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Redis when `REDIS_URL` is set, in-memory otherwise.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.redis_url {
            Some(url) => {
                tracing::info!("Using Redis storage");
                Arc::new(RedisStore::connect(url).await?)
            }
            None => {
                if config.is_development() {
                    tracing::info!("REDIS_URL not set; using in-memory storage");
                } else {
                    tracing::warn!("REDIS_URL not set; state is kept in memory only");
                }
                Arc::new(MemoryStore::new())
            }
        };
        Ok(Self::new(store, config.max_stored_file_wallets))
    }

    /// Missing key is `None`. Corrupt JSON is logged and also `None`.
    async fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::error!("Error loading {} from storage: {}", key, e);
                Ok(None)
            }
        }
    }

    async fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, raw).await
    }

    // ---------- saved wallets ----------
    pub async fn load_wallets(&self) -> Result<Vec<Wallet>> {
        Ok(self.load_json(KEY_WALLETS).await?.unwrap_or_default())
    }

    pub async fn save_wallets(&self, wallets: &[Wallet]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_json(KEY_WALLETS, wallets).await
    }

    /// Appends and returns the new total.
    pub async fn add_wallets(&self, new_wallets: &[Wallet]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load_wallets().await?;
        wallets.extend_from_slice(new_wallets);
        self.save_json(KEY_WALLETS, &wallets).await?;
        Ok(wallets.len())
    }

    pub async fn remove_wallet(&self, index: usize) -> Result<Wallet> {
        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load_wallets().await?;
        if index >= wallets.len() {
            return Err(AppError::NotFound(format!("Wallet #{}", index)));
        }
        let removed = wallets.remove(index);
        self.save_json(KEY_WALLETS, &wallets).await?;
        Ok(removed)
    }

    // ---------- RPC configs ----------
    /// Stored overrides, or the built-in defaults if none were ever saved.
    pub async fn load_rpc_configs(&self) -> Result<Vec<RpcConfig>> {
        Ok(self
            .load_json(KEY_RPC_CONFIGS)
            .await?
            .unwrap_or_else(default_rpc_configs))
    }

    pub async fn save_rpc_configs(&self, configs: &[RpcConfig]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_json(KEY_RPC_CONFIGS, configs).await
    }

    pub async fn add_rpc_config(&self, config: RpcConfig) -> Result<RpcConfig> {
        let _guard = self.write_lock.lock().await;
        let mut configs = self.load_rpc_configs().await?;
        configs.push(config.clone());
        self.save_json(KEY_RPC_CONFIGS, &configs).await?;
        Ok(config)
    }

    pub async fn update_rpc_config(&self, config: RpcConfig) -> Result<RpcConfig> {
        let _guard = self.write_lock.lock().await;
        let mut configs = self.load_rpc_configs().await?;
        let slot = configs
            .iter_mut()
            .find(|c| c.id == config.id)
            .ok_or_else(|| AppError::NotFound(format!("RPC config {}", config.id)))?;
        *slot = config.clone();
        self.save_json(KEY_RPC_CONFIGS, &configs).await?;
        Ok(config)
    }

    pub async fn remove_rpc_config(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut configs = self.load_rpc_configs().await?;
        let before = configs.len();
        configs.retain(|c| c.id != id);
        if configs.len() == before {
            return Err(AppError::NotFound(format!("RPC config {}", id)));
        }
        self.save_json(KEY_RPC_CONFIGS, &configs).await
    }

    pub async fn reset_rpc_configs(&self) -> Result<Vec<RpcConfig>> {
        let defaults = default_rpc_configs();
        self.save_rpc_configs(&defaults).await?;
        Ok(defaults)
    }

    // ---------- wallet files ----------
    pub async fn list_files(&self) -> Result<Vec<WalletFile>> {
        Ok(self.load_json(KEY_WALLET_FILES).await?.unwrap_or_default())
    }

    /// Returns `false` when the file is too large to persist.
    pub async fn add_file(&self, file: WalletFile) -> Result<bool> {
        if file.wallets.len() > self.max_file_wallets {
            tracing::warn!(
                "Not storing {} ({} wallets, limit {})",
                file.name,
                file.wallets.len(),
                self.max_file_wallets
            );
            return Ok(false);
        }
        let _guard = self.write_lock.lock().await;
        let mut files = self.list_files().await?;
        files.push(file);
        self.save_json(KEY_WALLET_FILES, &files).await?;
        Ok(true)
    }

    pub async fn get_file(&self, id: &str) -> Result<WalletFile> {
        self.list_files()
            .await?
            .into_iter()
            .find(|f| f.id == id)
            .ok_or_else(|| AppError::NotFound(format!("File {}", id)))
    }

    pub async fn remove_file(&self, id: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut files = self.list_files().await?;
        let before = files.len();
        files.retain(|f| f.id != id);
        if files.len() == before {
            return Err(AppError::NotFound(format!("File {}", id)));
        }
        self.save_json(KEY_WALLET_FILES, &files).await
    }

    // ---------- hand-over to the check view ----------
    pub async fn select_file(&self, file: &WalletFile) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.save_json(KEY_SELECTED_FILE, file).await
    }

    /// Reads and clears the selected file.
    pub async fn take_selected_file(&self) -> Result<Option<WalletFile>> {
        let _guard = self.write_lock.lock().await;
        let selected = self.load_json(KEY_SELECTED_FILE).await?;
        self.store.remove(KEY_SELECTED_FILE).await?;
        Ok(selected)
    }
}
