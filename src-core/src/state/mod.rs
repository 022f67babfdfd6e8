//! 状态管理模块
//!
//! 提供会话字段、Agent 状态推导和快照发布功能
//!
//! # 模块结构
//!
//! - `agent_state` - Agent 状态、连接阶段等核心类型
//! - `reducer` - 唯一的字段更新函数与状态推导
//! - `snapshot` - 快照、状态变更事件与无锁快照存储

mod agent_state;
mod reducer;
mod snapshot;

pub use agent_state::{Advisory, AgentState, ConnectionPhase, RemoteAudioHandle, SessionId};
pub use reducer::{project, reduce, SessionFields, Update};
pub use snapshot::{SessionSnapshot, SnapshotStore, StateChangeEvent, DEFAULT_LISTENER_CAPACITY};
