use std::sync::{Arc, Mutex, MutexGuard};

use arc_swap::ArcSwap;
use serde::Serialize;
use tokio::sync::mpsc;

use super::agent_state::{AgentState, ConnectionPhase, RemoteAudioHandle, SessionId};
use super::reducer::{project, SessionFields};
use crate::transport::ParticipantIdentity;

/// 默认监听器队列容量
pub const DEFAULT_LISTENER_CAPACITY: usize = 32;

/// 会话快照
///
/// 每次更新后整体替换，读取方永远看不到部分更新的状态
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// 当前会话编号
    pub session_id: Option<SessionId>,
    /// 推导出的 Agent 状态
    pub agent_state: AgentState,
    /// 连接阶段
    pub phase: ConnectionPhase,
    /// 本地是否静音
    pub muted: bool,
    /// 是否有 connect 正在进行
    pub connecting: bool,
    /// 代理的远端音频
    pub remote_audio: Option<RemoteAudioHandle>,
    /// 当前说话的参与者
    pub active_speakers: Vec<ParticipantIdentity>,
    /// 当前生效的提示
    pub advisory: Option<AgentState>,
}

impl SessionSnapshot {
    /// 从会话字段生成快照
    pub fn from_fields(session_id: Option<SessionId>, fields: &SessionFields) -> Self {
        Self {
            session_id,
            agent_state: project(fields),
            phase: fields.phase,
            muted: fields.muted,
            connecting: fields.connecting,
            remote_audio: fields.remote_audio.clone(),
            active_speakers: fields.active_speakers.clone(),
            advisory: fields.effective_advisory(),
        }
    }
}

/// 状态变更事件载荷
///
/// 扁平结构，便于 UI 层直接序列化消费
#[derive(Debug, Clone, Serialize)]
pub struct StateChangeEvent {
    /// Agent 状态名称
    pub agent_state: String,
    /// 连接阶段名称
    pub phase: String,
    /// 是否静音
    pub is_muted: bool,
    /// 是否连接中
    pub is_connecting: bool,
    /// 是否已连接
    pub is_connected: bool,
    /// 是否有远端音频
    pub has_remote_audio: bool,
    /// 远端音频轨道编号（如果有）
    pub remote_track_sid: Option<String>,
}

impl From<&SessionSnapshot> for StateChangeEvent {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            agent_state: snapshot.agent_state.name().to_string(),
            phase: snapshot.phase.name().to_string(),
            is_muted: snapshot.muted,
            is_connecting: snapshot.connecting,
            is_connected: snapshot.phase.is_connected(),
            has_remote_audio: snapshot.remote_audio.is_some(),
            remote_track_sid: snapshot
                .remote_audio
                .as_ref()
                .map(|handle| handle.track_sid.to_string()),
        }
    }
}

/// 快照存储
///
/// 读取无锁（ArcSwap），写入后按顺序通知所有监听者
pub struct SnapshotStore {
    /// 当前快照
    current: ArcSwap<SessionSnapshot>,

    /// 快照变更监听器列表
    listeners: Mutex<Vec<mpsc::Sender<SessionSnapshot>>>,

    /// 监听器队列容量
    capacity: usize,
}

impl SnapshotStore {
    /// 创建新的快照存储
    ///
    /// # Examples
    ///
    /// ```
    /// use voxroom_lib::state::SnapshotStore;
    ///
    /// let store = SnapshotStore::new(8);
    /// assert!(store.current().agent_state.is_idle());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self {
            current: ArcSwap::new(Arc::new(SessionSnapshot::default())),
            listeners: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// 获取当前快照
    ///
    /// 此方法是无锁的，可以在任何线程安全地调用
    pub fn current(&self) -> Arc<SessionSnapshot> {
        self.current.load_full()
    }

    /// 发布新快照并通知监听者
    ///
    /// 使用 `try_send`，队列已满的监听者会错过这一次通知；已关闭的监听者被移除
    pub fn publish(&self, snapshot: SessionSnapshot) {
        self.current.store(Arc::new(snapshot.clone()));

        let mut listeners = self.lock_listeners();
        listeners.retain(|tx| !tx.is_closed());
        for listener in listeners.iter() {
            if let Err(mpsc::error::TrySendError::Full(_)) = listener.try_send(snapshot.clone()) {
                tracing::debug!("Snapshot listener queue full, dropping notification");
            }
        }
    }

    /// 添加快照变更监听器
    pub fn subscribe(&self) -> mpsc::Receiver<SessionSnapshot> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.lock_listeners().push(tx);
        rx
    }

    /// 移除所有已关闭的监听器
    pub fn cleanup_listeners(&self) {
        self.lock_listeners().retain(|tx| !tx.is_closed());
    }

    /// 获取当前监听器数量
    pub fn listener_count(&self) -> usize {
        self.lock_listeners().len()
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<mpsc::Sender<SessionSnapshot>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(DEFAULT_LISTENER_CAPACITY)
    }
}
