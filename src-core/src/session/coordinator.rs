use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::{SessionError, SessionResult};
use crate::events::EventAggregator;
use crate::state::{
    reduce, AgentState, ConnectionPhase, RemoteAudioHandle, SessionFields, SessionId,
    SessionSnapshot, SnapshotStore, Update, DEFAULT_LISTENER_CAPACITY,
};
use crate::transport::{RoomConnector, RoomHandle, TransportError, TransportResult};

/// 默认握手超时（毫秒）
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

/// 会话配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 握手超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 快照监听器队列容量
    pub listener_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            listener_capacity: DEFAULT_LISTENER_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// 设置握手超时
    pub fn with_connect_timeout(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }
}

/// connect 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// 新会话已连接并发布了麦克风
    Connected(SessionId),
    /// 已有会话在连接或已连接，本次调用被忽略
    AlreadyActive,
}

impl ConnectOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected(_))
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match self {
            Self::Connected(id) => Some(*id),
            Self::AlreadyActive => None,
        }
    }
}

/// 当前会话持有的传输资源
struct ActiveSession {
    id: SessionId,
    room: Option<Arc<dyn RoomHandle>>,
    pump: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            room: None,
            pump: None,
        }
    }

    /// 停止事件泵，交出房间句柄
    fn release(self) -> Option<Arc<dyn RoomHandle>> {
        if let Some(pump) = self.pump {
            pump.abort();
        }
        self.room
    }
}

struct Inner {
    fields: SessionFields,
    session: Option<ActiveSession>,
    /// 最近一次被 disconnect 释放的会话
    cancelled: Option<SessionId>,
    next_id: u64,
}

impl Inner {
    fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|active| active.id)
    }

    fn is_current(&self, id: SessionId) -> bool {
        self.session_id() == Some(id)
    }

    /// 失效的会话是否由 disconnect 释放（而不是传输层）
    fn was_cancelled(&self, id: SessionId) -> bool {
        self.cancelled == Some(id)
    }
}

struct Shared {
    connector: Arc<dyn RoomConnector>,
    config: SessionConfig,
    inner: Mutex<Inner>,
    store: SnapshotStore,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 写入更新、重新推导并发布快照
    ///
    /// 调用方必须持有 `inner` 锁，保证读取方看到的总是完整的一次更新
    fn apply(&self, inner: &mut Inner, update: Update) {
        let name = update.name();
        if !reduce(&mut inner.fields, update) {
            debug!(update = name, "Update ignored");
            return;
        }

        let snapshot = SessionSnapshot::from_fields(inner.session_id(), &inner.fields);
        debug!(
            update = name,
            agent_state = %snapshot.agent_state,
            phase = %snapshot.phase,
            "Session state updated"
        );
        self.store.publish(snapshot);
    }

    /// 处理事件泵送来的更新
    fn handle_room_update(&self, session: SessionId, update: Update) {
        let mut inner = self.lock();
        if !inner.is_current(session) {
            debug!(session = %session, update = update.name(), "Discarding stale room event");
            return;
        }

        if let Update::PhaseChanged(
            phase @ (ConnectionPhase::Disconnected | ConnectionPhase::Failed),
        ) = update
        {
            info!(session = %session, phase = %phase, "Transport ended the session");
            let room = inner.session.take().and_then(ActiveSession::release);
            if let (ConnectionPhase::Failed, Some(room)) = (phase, room) {
                tokio::spawn(teardown(room));
            }
        }

        self.apply(&mut inner, update);
    }

    /// 同步重置会话状态，返回需要关闭的房间
    fn release(&self, inner: &mut Inner) -> Option<Arc<dyn RoomHandle>> {
        if let Some(id) = inner.session_id() {
            inner.cancelled = Some(id);
        }
        let room = inner.session.take().and_then(ActiveSession::release);
        self.apply(inner, Update::Reset);
        room
    }
}

/// 关闭房间，失败只记录日志
async fn teardown(room: Arc<dyn RoomHandle>) {
    if let Err(e) = room.disconnect().await {
        warn!(error = %e, "Room teardown failed");
    }
}

async fn publish_microphone(room: &dyn RoomHandle) -> TransportResult<()> {
    let track = room.capture_microphone().await?;
    room.publish_track(track).await
}

/// 实时语音会话协调器
///
/// 持有至多一个房间连接，聚合房间事件，对外暴露推导出的 Agent 状态。
/// 每个 UI 界面创建一个实例，以引用传递给使用方；实例被丢弃时无条件断开连接。
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use voxroom_lib::session::{SessionConfig, VoiceCoordinator};
/// use voxroom_lib::transport::MockConnector;
///
/// # #[tokio::main]
/// # async fn main() {
/// let coordinator = VoiceCoordinator::new(
///     Arc::new(MockConnector::default()),
///     SessionConfig::default(),
/// );
///
/// coordinator.connect("token", "wss://example.livekit.cloud").await.unwrap();
/// println!("agent is {}", coordinator.agent_state());
///
/// coordinator.toggle_mute().await.unwrap();
/// coordinator.disconnect().await;
/// # }
/// ```
pub struct VoiceCoordinator {
    shared: Arc<Shared>,
}

impl VoiceCoordinator {
    /// 创建协调器
    pub fn new(connector: Arc<dyn RoomConnector>, config: SessionConfig) -> Self {
        let store = SnapshotStore::new(config.listener_capacity);
        Self {
            shared: Arc::new(Shared {
                connector,
                config,
                inner: Mutex::new(Inner {
                    fields: SessionFields::default(),
                    session: None,
                    cancelled: None,
                    next_id: 0,
                }),
                store,
            }),
        }
    }

    /// 连接房间并发布本地麦克风
    ///
    /// 已有会话在连接或已连接时直接返回 [`ConnectOutcome::AlreadyActive`]，
    /// 不排队、不报错。
    ///
    /// # Errors
    ///
    /// - `SessionError::Transport` - 握手、麦克风采集或发布失败，阶段变为 Failed
    /// - `SessionError::Timeout` - 握手超时，阶段变为 Failed
    /// - `SessionError::Superseded` - connect 期间调用了 disconnect
    pub async fn connect(&self, token: &str, server_url: &str) -> SessionResult<ConnectOutcome> {
        let session = {
            let mut inner = self.shared.lock();
            if inner.fields.connecting || inner.fields.phase.is_live() {
                warn!(
                    phase = %inner.fields.phase,
                    connecting = inner.fields.connecting,
                    "Connect requested while a session is active, ignoring"
                );
                return Ok(ConnectOutcome::AlreadyActive);
            }

            // 非活跃阶段的会话已在失败或断开时释放
            debug_assert!(inner.session.is_none());
            inner.next_id += 1;
            let session = SessionId(inner.next_id);
            inner.session = Some(ActiveSession::new(session));
            self.shared.apply(&mut inner, Update::ConnectStarted);
            session
        };

        info!(session = %session, server_url, "Connecting to room");

        let timeout_ms = self.shared.config.connect_timeout_ms;
        let handshake = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.shared.connector.connect(server_url, token),
        )
        .await;

        let (room, events) = match handshake {
            Ok(Ok(connected)) => connected,
            Ok(Err(e)) => {
                error!(session = %session, error = %e, "Failed to connect to room");
                return Err(self.fail_connect(session, None, e.into()).await);
            }
            Err(_) => {
                error!(session = %session, timeout_ms, "Room handshake timed out");
                return Err(self
                    .fail_connect(session, None, SessionError::Timeout(timeout_ms))
                    .await);
            }
        };

        let wired = {
            let mut inner = self.shared.lock();
            if inner.is_current(session) {
                let aggregator = EventAggregator::new(session, room.local_identity());
                let weak = Arc::downgrade(&self.shared);
                let pump = aggregator.spawn(events, move |id, update| {
                    if let Some(shared) = weak.upgrade() {
                        shared.handle_room_update(id, update);
                    }
                });
                if let Some(active) = inner.session.as_mut() {
                    active.room = Some(Arc::clone(&room));
                    active.pump = Some(pump);
                }
                self.shared
                    .apply(&mut inner, Update::PhaseChanged(ConnectionPhase::Connected));
                true
            } else {
                false
            }
        };

        if !wired {
            warn!(session = %session, "Session released while connecting, closing room");
            teardown(room).await;
            return Err(SessionError::Superseded);
        }

        info!(session = %session, "Connected to room, publishing microphone");

        if let Err(e) = publish_microphone(room.as_ref()).await {
            error!(session = %session, error = %e, "Failed to publish microphone");
            return Err(self.fail_connect(session, Some(room), e.into()).await);
        }

        {
            let inner = self.shared.lock();
            if !inner.is_current(session) {
                if inner.was_cancelled(session) {
                    return Err(SessionError::Superseded);
                }
                warn!(session = %session, "Transport ended the session while publishing");
                return Err(TransportError::Disconnected.into());
            }
        }

        info!(session = %session, "Microphone activated and published");
        Ok(ConnectOutcome::Connected(session))
    }

    /// connect 失败：阶段变为 Failed，关闭已打开的房间
    async fn fail_connect(
        &self,
        session: SessionId,
        room: Option<Arc<dyn RoomHandle>>,
        err: SessionError,
    ) -> SessionError {
        {
            let mut inner = self.shared.lock();
            if !inner.is_current(session) {
                if inner.was_cancelled(session) {
                    debug!(session = %session, error = %err, "Connect failed after being superseded");
                    return SessionError::Superseded;
                }
                // 传输层已结束会话并处理了房间，只需把错误交给调用方
                debug!(session = %session, error = %err, "Connect failed after transport ended the session");
                return err;
            }
            if let Some(active) = inner.session.take() {
                active.release();
            }
            self.shared.apply(&mut inner, Update::ConnectFailed);
        }

        if let Some(room) = room {
            teardown(room).await;
        }
        err
    }

    /// 断开连接
    ///
    /// 先同步重置对外状态（Idle / Disconnected），再等待传输层释放资源。
    /// 没有会话时为空操作；不会返回错误，可以重复调用。
    pub async fn disconnect(&self) {
        let room = {
            let mut inner = self.shared.lock();
            if inner.session.is_none() && inner.fields.phase == ConnectionPhase::Disconnected {
                debug!("Disconnect requested without a session, ignoring");
                return;
            }
            info!(session = ?inner.session_id(), "Disconnecting from room");
            self.shared.release(&mut inner)
        };

        if let Some(room) = room {
            teardown(room).await;
        }

        info!("Disconnected from room");
    }

    /// 切换本地静音
    ///
    /// 立即重新推导状态，不等待传输层回执。返回切换后的静音状态；
    /// 没有已连接的房间时为空操作。
    ///
    /// # Errors
    ///
    /// 传输层切换麦克风失败时恢复原静音状态并返回 `SessionError::Transport`
    pub async fn toggle_mute(&self) -> SessionResult<bool> {
        let (session, room, muted) = {
            let mut inner = self.shared.lock();
            let Some((session, Some(room))) = inner
                .session
                .as_ref()
                .map(|active| (active.id, active.room.clone()))
            else {
                warn!("Toggle mute requested without a connected room, ignoring");
                return Ok(inner.fields.muted);
            };

            let muted = !inner.fields.muted;
            self.shared.apply(&mut inner, Update::MuteChanged(muted));
            (session, room, muted)
        };

        info!(session = %session, muted, "Toggling microphone");

        if let Err(e) = room.set_microphone_enabled(!muted).await {
            warn!(session = %session, error = %e, "Failed to toggle microphone, reverting");
            let mut inner = self.shared.lock();
            if inner.is_current(session) && inner.fields.muted == muted {
                self.shared.apply(&mut inner, Update::MuteChanged(!muted));
            }
            return Err(e.into());
        }

        Ok(muted)
    }

    /// 关闭协调器并等待传输层释放资源
    pub async fn shutdown(self) {
        self.disconnect().await;
    }

    /// 获取当前快照
    ///
    /// 此方法是无锁的，返回的快照总是某次完整更新之后的状态
    pub fn snapshot(&self) -> Arc<SessionSnapshot> {
        self.shared.store.current()
    }

    pub fn agent_state(&self) -> AgentState {
        self.snapshot().agent_state
    }

    pub fn connection_phase(&self) -> ConnectionPhase {
        self.snapshot().phase
    }

    pub fn is_muted(&self) -> bool {
        self.snapshot().muted
    }

    pub fn is_connecting(&self) -> bool {
        self.snapshot().connecting
    }

    pub fn remote_audio(&self) -> Option<RemoteAudioHandle> {
        self.snapshot().remote_audio.clone()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.snapshot().session_id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.shared.config
    }

    /// 订阅快照变更
    pub fn subscribe(&self) -> mpsc::Receiver<SessionSnapshot> {
        self.shared.store.subscribe()
    }

    /// 移除已关闭的监听器
    pub fn cleanup_listeners(&self) {
        self.shared.store.cleanup_listeners();
    }

    pub fn listener_count(&self) -> usize {
        self.shared.store.listener_count()
    }
}

impl Drop for VoiceCoordinator {
    fn drop(&mut self) {
        let room = {
            let mut inner = self.shared.lock();
            if inner.session.is_none() {
                return;
            }
            self.shared.release(&mut inner)
        };

        if let Some(room) = room {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(teardown(room));
                }
                Err(_) => warn!("No tokio runtime, room dropped without teardown"),
            }
        }
    }
}
