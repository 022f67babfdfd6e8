//! 会话字段的唯一更新入口与状态推导
//!
//! 所有事件处理器和生命周期操作都只产生 [`Update`]，由 [`reduce`] 统一写入
//! [`SessionFields`]，再由 [`project`] 重新计算 [`AgentState`]。
//! 推导每次都从完整字段重新计算，不做增量更新。

use serde::Serialize;

use super::agent_state::{Advisory, AgentState, ConnectionPhase, RemoteAudioHandle};
use crate::transport::{ParticipantIdentity, TrackSid};

/// 会话字段
///
/// `seq` 每次生效的更新递增一次；`structural_seq` 记录最近一次结构性更新的序号
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionFields {
    /// 连接阶段
    pub phase: ConnectionPhase,
    /// 是否有 connect 正在进行
    pub connecting: bool,
    /// 本地麦克风是否静音
    pub muted: bool,
    /// 代理的远端音频
    pub remote_audio: Option<RemoteAudioHandle>,
    /// 当前说话的参与者
    pub active_speakers: Vec<ParticipantIdentity>,
    /// 说话者中是否有远端参与者
    pub remote_speaking: bool,
    /// 最近一次提示
    pub advisory: Option<Advisory>,
    /// 更新序号
    pub seq: u64,
    /// 最近一次结构性更新的序号
    pub structural_seq: u64,
}

impl SessionFields {
    /// 提示是否比最近一次结构性更新更新
    pub fn effective_advisory(&self) -> Option<AgentState> {
        self.advisory
            .filter(|advisory| advisory.seq > self.structural_seq)
            .map(|advisory| advisory.state)
    }

    fn clear_session_facts(&mut self) {
        self.connecting = false;
        self.muted = false;
        self.remote_audio = None;
        self.active_speakers.clear();
        self.remote_speaking = false;
        self.advisory = None;
    }
}

/// 会话字段更新
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// 开始新的 connect
    ConnectStarted,

    /// 连接阶段变化
    PhaseChanged(ConnectionPhase),

    /// connect 失败（握手、超时、麦克风或发布失败）
    ConnectFailed,

    /// 订阅到远端音频
    AudioSubscribed(RemoteAudioHandle),

    /// 远端音频取消订阅
    AudioUnsubscribed(TrackSid),

    /// 说话者集合变化
    SpeakersChanged {
        speakers: Vec<ParticipantIdentity>,
        remote_speaking: bool,
    },

    /// 数据通道提示
    Advisory(AgentState),

    /// 本地静音变化
    MuteChanged(bool),

    /// 断开并清空会话
    Reset,
}

impl Update {
    /// 获取更新名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            Self::ConnectStarted => "connect_started",
            Self::PhaseChanged(_) => "phase_changed",
            Self::ConnectFailed => "connect_failed",
            Self::AudioSubscribed(_) => "audio_subscribed",
            Self::AudioUnsubscribed(_) => "audio_unsubscribed",
            Self::SpeakersChanged { .. } => "speakers_changed",
            Self::Advisory(_) => "advisory",
            Self::MuteChanged(_) => "mute_changed",
            Self::Reset => "reset",
        }
    }

    /// 是否为结构性更新（提示以外的都是）
    pub fn is_structural(&self) -> bool {
        !matches!(self, Self::Advisory(_))
    }
}

/// 将一次更新写入会话字段
///
/// 返回 `false` 表示该更新被忽略（例如取消订阅的轨道不是当前音频轨道）
pub fn reduce(fields: &mut SessionFields, update: Update) -> bool {
    let structural = update.is_structural();

    match update {
        Update::ConnectStarted => {
            fields.clear_session_facts();
            fields.phase = ConnectionPhase::Connecting;
            fields.connecting = true;
        }
        Update::PhaseChanged(phase) => {
            fields.phase = phase;
            match phase {
                ConnectionPhase::Connected => fields.connecting = false,
                ConnectionPhase::Disconnected | ConnectionPhase::Failed => {
                    fields.clear_session_facts()
                }
                ConnectionPhase::Connecting | ConnectionPhase::Reconnecting => {}
            }
        }
        Update::ConnectFailed => {
            fields.clear_session_facts();
            fields.phase = ConnectionPhase::Failed;
        }
        Update::AudioSubscribed(handle) => {
            fields.remote_audio = Some(handle);
        }
        Update::AudioUnsubscribed(sid) => {
            let matches_current = fields
                .remote_audio
                .as_ref()
                .is_some_and(|handle| handle.track_sid == sid);
            if !matches_current {
                return false;
            }
            fields.remote_audio = None;
        }
        Update::SpeakersChanged {
            speakers,
            remote_speaking,
        } => {
            fields.active_speakers = speakers;
            fields.remote_speaking = remote_speaking;
        }
        Update::Advisory(state) => {
            fields.advisory = Some(Advisory {
                state,
                seq: fields.seq + 1,
            });
        }
        Update::MuteChanged(muted) => {
            fields.muted = muted;
        }
        Update::Reset => {
            fields.clear_session_facts();
            fields.phase = ConnectionPhase::Disconnected;
        }
    }

    fields.seq += 1;
    if structural {
        fields.structural_seq = fields.seq;
    }
    true
}

/// 从会话字段推导 Agent 状态
///
/// 优先级：
/// 1. Connecting → Thinking
/// 2. Disconnected / Failed → Idle
/// 3. 比最近结构性更新更新的提示 → 提示的状态
/// 4. 有远端音频或远端参与者在说话 → Speaking
/// 5. 静音 → Thinking
/// 6. Connected → Listening，否则 Idle
pub fn project(fields: &SessionFields) -> AgentState {
    match fields.phase {
        ConnectionPhase::Connecting => return AgentState::Thinking,
        ConnectionPhase::Disconnected | ConnectionPhase::Failed => return AgentState::Idle,
        ConnectionPhase::Connected | ConnectionPhase::Reconnecting => {}
    }

    if let Some(state) = fields.effective_advisory() {
        return state;
    }

    if fields.remote_audio.is_some() || fields.remote_speaking {
        AgentState::Speaking
    } else if fields.muted {
        AgentState::Thinking
    } else if fields.phase.is_connected() {
        AgentState::Listening
    } else {
        AgentState::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> SessionFields {
        let mut fields = SessionFields::default();
        reduce(&mut fields, Update::ConnectStarted);
        reduce(&mut fields, Update::PhaseChanged(ConnectionPhase::Connected));
        fields
    }

    fn agent_audio(sid: &str) -> RemoteAudioHandle {
        RemoteAudioHandle {
            track_sid: TrackSid::new(sid),
            participant: ParticipantIdentity::new("agent"),
        }
    }

    #[test]
    fn test_default_is_idle() {
        assert_eq!(project(&SessionFields::default()), AgentState::Idle);
    }

    #[test]
    fn test_connecting_is_thinking() {
        let mut fields = SessionFields::default();
        reduce(&mut fields, Update::ConnectStarted);
        assert!(fields.connecting);
        assert_eq!(project(&fields), AgentState::Thinking);
    }

    #[test]
    fn test_connected_clears_in_flight_flag() {
        let fields = connected();
        assert!(!fields.connecting);
        assert_eq!(project(&fields), AgentState::Listening);
    }

    #[test]
    fn test_remote_audio_wins_over_mute() {
        let mut fields = connected();
        reduce(&mut fields, Update::MuteChanged(true));
        assert_eq!(project(&fields), AgentState::Thinking);

        reduce(&mut fields, Update::AudioSubscribed(agent_audio("TR_1")));
        assert_eq!(project(&fields), AgentState::Speaking);
    }

    #[test]
    fn test_unsubscribe_only_matching_track() {
        let mut fields = connected();
        reduce(&mut fields, Update::AudioSubscribed(agent_audio("TR_1")));
        let seq = fields.seq;

        assert!(!reduce(&mut fields, Update::AudioUnsubscribed(TrackSid::new("TR_other"))));
        assert!(fields.remote_audio.is_some());
        assert_eq!(fields.seq, seq);

        assert!(reduce(&mut fields, Update::AudioUnsubscribed(TrackSid::new("TR_1"))));
        assert!(fields.remote_audio.is_none());
        assert_eq!(project(&fields), AgentState::Listening);
    }

    #[test]
    fn test_empty_speakers_while_muted_is_thinking() {
        let mut fields = connected();
        reduce(&mut fields, Update::MuteChanged(true));
        reduce(
            &mut fields,
            Update::SpeakersChanged {
                speakers: vec![],
                remote_speaking: false,
            },
        );
        assert_eq!(project(&fields), AgentState::Thinking);
    }

    #[test]
    fn test_remote_speaker_is_speaking() {
        let mut fields = connected();
        reduce(
            &mut fields,
            Update::SpeakersChanged {
                speakers: vec![ParticipantIdentity::new("agent")],
                remote_speaking: true,
            },
        );
        assert_eq!(project(&fields), AgentState::Speaking);
    }

    #[test]
    fn test_advisory_until_next_structural_update() {
        let mut fields = connected();
        reduce(&mut fields, Update::Advisory(AgentState::Thinking));
        assert_eq!(fields.effective_advisory(), Some(AgentState::Thinking));
        assert_eq!(project(&fields), AgentState::Thinking);

        reduce(
            &mut fields,
            Update::SpeakersChanged {
                speakers: vec![],
                remote_speaking: false,
            },
        );
        assert_eq!(fields.effective_advisory(), None);
        assert_eq!(project(&fields), AgentState::Listening);
    }

    #[test]
    fn test_advisory_ignored_without_session() {
        let mut fields = SessionFields::default();
        reduce(&mut fields, Update::Advisory(AgentState::Speaking));
        assert_eq!(project(&fields), AgentState::Idle);
    }

    #[test]
    fn test_failed_and_reset_clear_session_facts() {
        let mut fields = connected();
        reduce(&mut fields, Update::AudioSubscribed(agent_audio("TR_1")));
        reduce(&mut fields, Update::MuteChanged(true));

        reduce(&mut fields, Update::ConnectFailed);
        assert_eq!(fields.phase, ConnectionPhase::Failed);
        assert!(fields.remote_audio.is_none());
        assert!(!fields.muted);
        assert_eq!(project(&fields), AgentState::Idle);

        let mut fields = connected();
        reduce(&mut fields, Update::Advisory(AgentState::Speaking));
        reduce(&mut fields, Update::Reset);
        assert_eq!(fields.phase, ConnectionPhase::Disconnected);
        assert!(fields.advisory.is_none());
        assert_eq!(project(&fields), AgentState::Idle);
    }

    #[test]
    fn test_reconnecting_without_signals_is_idle() {
        let mut fields = connected();
        reduce(&mut fields, Update::PhaseChanged(ConnectionPhase::Reconnecting));
        assert_eq!(project(&fields), AgentState::Idle);

        reduce(&mut fields, Update::MuteChanged(true));
        assert_eq!(project(&fields), AgentState::Thinking);
    }
}
