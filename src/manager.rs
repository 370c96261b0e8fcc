//! Copyright (c) 2025-2026, Kirky.X
//!
//! MIT License
//!
//! 该模块定义了存档数据管理器，按所有者和 (数据存储名称, 条目键) 两级缓存同步器。

use crate::config::Config;
use crate::data::{SaveData, SyncOptions};
use crate::error::{Result, SyncError};
use crate::metrics::GLOBAL_METRICS;
use crate::transport::{DataStoreTransport, OpenCloudTransportFactory, TransportFactory};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use secrecy::SecretString;
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

/// 玩家数据使用的数据存储名称
pub const PLAYER_DATA_STORE: &str = "PlayerDataStore_PlayerData";

/// 玩家数据条目键的前缀
pub const PLAYER_KEY_PREFIX: &str = "PlayerList$";

type SlotKey = (String, String);
type Slot = Arc<OnceCell<Arc<SaveData>>>;
type SlotMap = DashMap<SlotKey, Slot>;

/// 驱逐句柄
///
/// 由注册表在创建同步器时交给它，断开连接时只移除创建它的那个缓存槽
pub struct EvictionHandle {
    owner_id: u64,
    slots: Weak<SlotMap>,
    key: SlotKey,
    slot: Weak<OnceCell<Arc<SaveData>>>,
}

impl EvictionHandle {
    pub(crate) fn evict(&self) {
        let Some(slots) = self.slots.upgrade() else {
            return;
        };
        let removed = slots.remove_if(&self.key, |_, slot| {
            std::ptr::eq(Arc::as_ptr(slot), self.slot.as_ptr())
        });
        if removed.is_some() {
            GLOBAL_METRICS.set_cached_save_data(self.owner_id, slots.len());
            debug!(
                "EvictionHandle: removed {}/{} from owner {}",
                self.key.0, self.key.1, self.owner_id
            );
        }
    }
}

/// 所有者上下文
///
/// 持有该所有者自己的传输实例和存档数据缓存
pub struct OwnerContext {
    /// 所有者（游戏）id
    owner_id: u64,
    /// 远程传输
    transport: Arc<dyn DataStoreTransport>,
    /// 同步选项
    options: SyncOptions,
    /// 存档数据缓存
    save_data: Arc<SlotMap>,
}

impl OwnerContext {
    pub fn new(owner_id: u64, transport: Arc<dyn DataStoreTransport>, options: SyncOptions) -> Self {
        Self {
            owner_id,
            transport,
            options,
            save_data: Arc::new(DashMap::new()),
        }
    }

    pub fn owner_id(&self) -> u64 {
        self.owner_id
    }

    pub fn transport(&self) -> &Arc<dyn DataStoreTransport> {
        &self.transport
    }

    /// 替换该所有者后续请求使用的凭据
    pub fn set_credential(&self, credential: SecretString) {
        self.transport.set_credential(credential);
    }

    /// 获取存档数据
    ///
    /// 首次访问时创建同步器并在临界区内完成初始重新加载，
    /// 并发的首次请求只会触发一次创建和一次加载。
    /// 初始加载失败时错误返回给调用方，下一次请求会重新尝试。
    ///
    /// # 参数
    ///
    /// * `store_name` - 数据存储名称
    /// * `store_key` - 条目键
    ///
    /// # 返回值
    ///
    /// 返回已加载的存档数据
    #[instrument(skip(self), level = "debug", fields(owner = self.owner_id))]
    pub async fn get_save_data(&self, store_name: &str, store_key: &str) -> Result<Arc<SaveData>> {
        let key = (store_name.to_string(), store_key.to_string());
        let lookup_key = key.clone();
        let slot = self
            .save_data
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();

        if let Some(save_data) = slot.get() {
            return Ok(save_data.clone());
        }

        let init = {
            let owner_id = self.owner_id;
            let transport = self.transport.clone();
            let options = self.options.clone();
            let slots = Arc::downgrade(&self.save_data);
            let slot_ref = Arc::downgrade(&slot);
            move || async move {
                let save_data = Arc::new(SaveData::new(
                    owner_id,
                    key.0.clone(),
                    key.1.clone(),
                    transport,
                    options,
                ));
                save_data.reload().await?;
                info!(
                    "SaveData created: owner={}, store={}, key={}",
                    owner_id, key.0, key.1
                );
                save_data.attach_eviction(EvictionHandle {
                    owner_id,
                    slots,
                    key,
                    slot: slot_ref,
                });
                Ok::<_, SyncError>(save_data)
            }
        };
        let save_data = match slot.get_or_try_init(init).await {
            Ok(save_data) => save_data.clone(),
            Err(e) => {
                // 只移除本次创建失败的空槽，不影响已被替换的新槽
                let removed = self.save_data.remove_if(&lookup_key, |_, s| {
                    Arc::ptr_eq(s, &slot) && !s.initialized()
                });
                if removed.is_some() {
                    GLOBAL_METRICS.set_cached_save_data(self.owner_id, self.save_data.len());
                    debug!(
                        "SaveData slot released after failed reload: {}/{}",
                        lookup_key.0, lookup_key.1
                    );
                }
                return Err(e);
            }
        };

        // 并发等待者可能在空槽被移除后才完成初始化，此时把槽放回注册表
        if save_data.is_attached() {
            if let Entry::Vacant(entry) = self.save_data.entry(lookup_key) {
                entry.insert(slot.clone());
            }
        }

        GLOBAL_METRICS.set_cached_save_data(self.owner_id, self.save_data.len());
        Ok(save_data)
    }

    /// 获取玩家的存档数据
    pub async fn get_player_save_data(&self, user_id: u64) -> Result<Arc<SaveData>> {
        self.get_save_data(PLAYER_DATA_STORE, &format!("{}{}", PLAYER_KEY_PREFIX, user_id))
            .await
    }

    /// 当前缓存的存档数量（包括正在创建的，不含初始加载失败的）
    pub fn cached_count(&self) -> usize {
        self.save_data.len()
    }

    /// 是否缓存了指定的存档数据
    pub fn is_cached(&self, store_name: &str, store_key: &str) -> bool {
        self.save_data
            .get(&(store_name.to_string(), store_key.to_string()))
            .is_some_and(|slot| slot.initialized())
    }
}

impl fmt::Debug for OwnerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerContext")
            .field("owner_id", &self.owner_id)
            .field("cached", &self.save_data.len())
            .finish()
    }
}

/// 存档数据管理器
///
/// 以构造参数注入传输工厂，不使用全局单例
pub struct SaveDataManager {
    /// 传输工厂
    factory: Arc<dyn TransportFactory>,
    /// 同步选项
    options: SyncOptions,
    /// 所有者上下文缓存
    owners: DashMap<u64, Arc<OwnerContext>>,
}

impl SaveDataManager {
    /// 创建新的存档数据管理器
    pub fn new(factory: impl TransportFactory + 'static, options: SyncOptions) -> Self {
        Self {
            factory: Arc::new(factory),
            options,
            owners: DashMap::new(),
        }
    }

    /// 根据配置创建使用 Open Cloud 传输的管理器
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            OpenCloudTransportFactory::new(config.open_cloud.clone()),
            config.sync_options(),
        )
    }

    /// 获取或创建所有者上下文
    ///
    /// 已存在时把凭据重新应用到现有的传输实例上，而不是丢弃缓存
    pub fn owner(&self, owner_id: u64, credential: SecretString) -> Result<Arc<OwnerContext>> {
        match self.owners.entry(owner_id) {
            Entry::Occupied(entry) => {
                let owner = entry.get().clone();
                owner.set_credential(credential);
                Ok(owner)
            }
            Entry::Vacant(entry) => {
                let transport = self.factory.create(owner_id, credential)?;
                let owner = Arc::new(OwnerContext::new(owner_id, transport, self.options.clone()));
                entry.insert(owner.clone());
                info!("OwnerContext created: owner={}", owner_id);
                Ok(owner)
            }
        }
    }

    /// 获取存档数据
    ///
    /// 所有者缓存的锁在访问存档缓存之前释放
    pub async fn get_save_data(
        &self,
        owner_id: u64,
        store_name: &str,
        store_key: &str,
        credential: SecretString,
    ) -> Result<Arc<SaveData>> {
        let owner = self.owner(owner_id, credential)?;
        owner.get_save_data(store_name, store_key).await
    }

    /// 获取玩家的存档数据
    pub async fn get_player_save_data(
        &self,
        owner_id: u64,
        user_id: u64,
        credential: SecretString,
    ) -> Result<Arc<SaveData>> {
        let owner = self.owner(owner_id, credential)?;
        owner.get_player_save_data(user_id).await
    }

    /// 获取已缓存的所有者上下文
    pub fn cached_owner(&self, owner_id: u64) -> Option<Arc<OwnerContext>> {
        self.owners.get(&owner_id).map(|r| r.value().clone())
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }
}

impl fmt::Debug for SaveDataManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveDataManager")
            .field("owners", &self.owners.len())
            .field("options", &self.options)
            .finish()
    }
}
