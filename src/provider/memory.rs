//! In-process channel provider
//!
//! Keeps channels, messages and roles in memory. A recording provider also
//! logs every request it receives; the log is unbounded, so `serve` runs
//! without it. Failures can be injected per operation and an artificial latency
//! applied to every call, which is how the lifecycle's timeout handling is
//! exercised.

use super::{
    ChannelProvider, ChannelRef, MessageContent, MessageRef, PermissionOverwrite, ProviderError,
    ProviderResult, ProvisionRequest, RoleRef,
};
use crate::core::{CategoryId, ChannelId, GroupId, MessageId, RoleId};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Provider operations, used to inspect and script the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderOp {
    ProvisionChannel,
    UpdateChannelVisibility,
    RenameChannel,
    SendMessage,
    UpdateMessage,
    LookupRole,
    FindChannelByName,
}

/// One recorded request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderCall {
    pub op: ProviderOp,
    pub channel: Option<ChannelId>,
    pub detail: String,
}

/// A channel held by the memory provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryChannel {
    pub group: GroupId,
    pub parent: Option<CategoryId>,
    pub name: String,
    pub overwrites: Vec<PermissionOverwrite>,
    pub messages: BTreeMap<MessageId, MessageContent>,
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: u64,
    categories: HashSet<(GroupId, CategoryId)>,
    roles: HashMap<(GroupId, RoleId), String>,
    channels: BTreeMap<ChannelId, MemoryChannel>,
    recording: bool,
    calls: Vec<ProviderCall>,
    failures: HashMap<ProviderOp, VecDeque<ProviderError>>,
    latency: Option<Duration>,
}

impl MemoryState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, op: ProviderOp, channel: Option<ChannelId>, detail: String) {
        if !self.recording {
            return;
        }
        self.calls.push(ProviderCall {
            op,
            channel,
            detail,
        });
    }

    fn injected_failure(&mut self, op: ProviderOp) -> Option<ProviderError> {
        self.failures.get_mut(&op).and_then(VecDeque::pop_front)
    }

    fn channel_mut(&mut self, channel: ChannelId) -> ProviderResult<&mut MemoryChannel> {
        self.channels.get_mut(&channel).ok_or_else(|| ProviderError::NotFound {
            what: format!("channel {channel}"),
        })
    }
}

/// In-memory [`ChannelProvider`]
#[derive(Debug, Default)]
pub struct MemoryProvider {
    state: Mutex<MemoryState>,
}

impl MemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1_000,
                ..MemoryState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep going
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Keep a log of every request, for [`calls`](Self::calls) and
    /// [`call_count`](Self::call_count)
    #[must_use]
    pub fn recording(self) -> Self {
        self.lock().recording = true;
        self
    }

    /// Register a category channels may be created under
    #[must_use]
    pub fn with_category(self, group: GroupId, category: CategoryId) -> Self {
        self.lock().categories.insert((group, category));
        self
    }

    /// Register a role in a group
    #[must_use]
    pub fn with_role(self, group: GroupId, role: RoleId, name: &str) -> Self {
        self.lock().roles.insert((group, role), name.to_string());
        self
    }

    /// Create a channel directly, bypassing request recording
    pub fn add_channel(&self, group: GroupId, name: &str) -> ChannelRef {
        let mut state = self.lock();
        let id = ChannelId::new(state.next_id());
        state.channels.insert(
            id,
            MemoryChannel {
                group,
                parent: None,
                name: name.to_string(),
                overwrites: Vec::new(),
                messages: BTreeMap::new(),
            },
        );
        ChannelRef::new(id, name)
    }

    /// Register a channel that exists on the platform, keeping its id
    ///
    /// Does nothing when the id is already known.
    pub fn observe_channel(&self, group: GroupId, channel: &ChannelRef) {
        let mut state = self.lock();
        state.next_id = state.next_id.max(channel.id.get());
        state
            .channels
            .entry(channel.id)
            .or_insert_with(|| MemoryChannel {
                group,
                parent: None,
                name: channel.name.clone(),
                overwrites: Vec::new(),
                messages: BTreeMap::new(),
            });
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: ProviderOp, error: ProviderError) {
        self.lock().failures.entry(op).or_default().push_back(error);
    }

    /// Delay every subsequent call
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// All recorded requests, in order; empty unless [`recording`](Self::recording)
    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.lock().calls.clone()
    }

    /// Number of recorded requests of one kind
    #[must_use]
    pub fn call_count(&self, op: ProviderOp) -> usize {
        self.lock().calls.iter().filter(|c| c.op == op).count()
    }

    #[must_use]
    pub fn channel(&self, channel: ChannelId) -> Option<MemoryChannel> {
        self.lock().channels.get(&channel).cloned()
    }

    /// Reference to a channel with its current name
    #[must_use]
    pub fn channel_ref(&self, channel: ChannelId) -> Option<ChannelRef> {
        self.lock()
            .channels
            .get(&channel)
            .map(|c| ChannelRef::new(channel, c.name.clone()))
    }

    /// Messages of a channel, oldest first
    #[must_use]
    pub fn messages(&self, channel: ChannelId) -> Vec<(MessageRef, MessageContent)> {
        self.lock()
            .channels
            .get(&channel)
            .map(|c| {
                c.messages
                    .iter()
                    .map(|(id, content)| {
                        (
                            MessageRef {
                                channel_id: channel,
                                message_id: *id,
                            },
                            content.clone(),
                        )
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record the request when recording, apply latency and consume an injected failure
    async fn begin(
        &self,
        op: ProviderOp,
        channel: Option<ChannelId>,
        detail: String,
    ) -> ProviderResult<()> {
        let (latency, failure) = {
            let mut state = self.lock();
            state.record(op, channel, detail);
            (state.latency, state.injected_failure(op))
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        failure.map_or(Ok(()), Err)
    }
}

#[async_trait]
impl ChannelProvider for MemoryProvider {
    async fn provision_channel(&self, request: &ProvisionRequest) -> ProviderResult<ChannelRef> {
        self.begin(ProviderOp::ProvisionChannel, None, request.name.clone())
            .await?;

        let mut state = self.lock();
        if !state.categories.contains(&(request.group, request.parent)) {
            return Err(ProviderError::NotFound {
                what: format!("category {}", request.parent),
            });
        }
        let taken = state
            .channels
            .values()
            .any(|c| c.group == request.group && c.name == request.name);
        if taken {
            return Err(ProviderError::NameConflict {
                name: request.name.clone(),
            });
        }

        let id = ChannelId::new(state.next_id());
        state.channels.insert(
            id,
            MemoryChannel {
                group: request.group,
                parent: Some(request.parent),
                name: request.name.clone(),
                overwrites: request.overwrites.clone(),
                messages: BTreeMap::new(),
            },
        );
        Ok(ChannelRef::new(id, request.name.clone()))
    }

    async fn update_channel_visibility(
        &self,
        channel: ChannelId,
        overwrites: &[PermissionOverwrite],
    ) -> ProviderResult<()> {
        self.begin(
            ProviderOp::UpdateChannelVisibility,
            Some(channel),
            format!("{} overwrites", overwrites.len()),
        )
        .await?;

        self.lock().channel_mut(channel)?.overwrites = overwrites.to_vec();
        Ok(())
    }

    async fn rename_channel(&self, channel: ChannelId, name: &str) -> ProviderResult<()> {
        self.begin(ProviderOp::RenameChannel, Some(channel), name.to_string())
            .await?;

        self.lock().channel_mut(channel)?.name = name.to_string();
        Ok(())
    }

    async fn send_message(
        &self,
        channel: ChannelId,
        content: &MessageContent,
    ) -> ProviderResult<MessageRef> {
        self.begin(ProviderOp::SendMessage, Some(channel), content.body.clone())
            .await?;

        let mut state = self.lock();
        let message_id = MessageId::new(state.next_id());
        state
            .channel_mut(channel)?
            .messages
            .insert(message_id, content.clone());
        Ok(MessageRef {
            channel_id: channel,
            message_id,
        })
    }

    async fn update_message(
        &self,
        message: &MessageRef,
        content: &MessageContent,
    ) -> ProviderResult<()> {
        self.begin(
            ProviderOp::UpdateMessage,
            Some(message.channel_id),
            content.body.clone(),
        )
        .await?;

        let mut state = self.lock();
        let slot = state
            .channel_mut(message.channel_id)?
            .messages
            .get_mut(&message.message_id)
            .ok_or_else(|| ProviderError::NotFound {
                what: format!("message {}", message.message_id),
            })?;
        *slot = content.clone();
        Ok(())
    }

    async fn lookup_role(&self, group: GroupId, role: RoleId) -> ProviderResult<Option<RoleRef>> {
        self.begin(ProviderOp::LookupRole, None, role.to_string())
            .await?;

        Ok(self.lock().roles.get(&(group, role)).map(|name| RoleRef {
            id: role,
            name: name.clone(),
        }))
    }

    async fn find_channel_by_name(
        &self,
        group: GroupId,
        name: &str,
    ) -> ProviderResult<Option<ChannelRef>> {
        self.begin(ProviderOp::FindChannelByName, None, name.to_string())
            .await?;

        Ok(self
            .lock()
            .channels
            .iter()
            .find(|(_, c)| c.group == group && c.name == name)
            .map(|(id, c)| ChannelRef::new(*id, c.name.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: GroupId = GroupId::new(1);
    const CATEGORY: CategoryId = CategoryId::new(2);

    fn request(name: &str) -> ProvisionRequest {
        ProvisionRequest {
            group: GROUP,
            parent: CATEGORY,
            name: name.to_string(),
            overwrites: Vec::new(),
            reason: "test".to_string(),
        }
    }

    #[tokio::test]
    async fn test_provision_and_find() {
        let provider = MemoryProvider::new().with_category(GROUP, CATEGORY);

        let channel = provider.provision_channel(&request("support-ayse")).await.unwrap();
        let found = provider
            .find_channel_by_name(GROUP, "support-ayse")
            .await
            .unwrap();
        assert_eq!(found, Some(channel));
        assert!(provider
            .find_channel_by_name(GroupId::new(99), "support-ayse")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_provision_requires_category() {
        let provider = MemoryProvider::new();
        let err = provider.provision_channel(&request("x")).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let provider = MemoryProvider::new()
            .recording()
            .with_category(GROUP, CATEGORY);
        provider.fail_next(ProviderOp::ProvisionChannel, ProviderError::PermissionDenied);

        assert_eq!(
            provider.provision_channel(&request("a")).await.unwrap_err(),
            ProviderError::PermissionDenied
        );
        assert!(provider.provision_channel(&request("a")).await.is_ok());
        assert_eq!(provider.call_count(ProviderOp::ProvisionChannel), 2);
    }

    #[tokio::test]
    async fn test_messages_and_rename() {
        let provider = MemoryProvider::new();
        let channel = provider.add_channel(GROUP, "support-bob");

        let message = provider
            .send_message(channel.id, &MessageContent::text("hello"))
            .await
            .unwrap();
        provider
            .update_message(&message, &MessageContent::text("edited"))
            .await
            .unwrap();
        provider.rename_channel(channel.id, "closed-support-bob").await.unwrap();

        let messages = provider.messages(channel.id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].1.body, "edited");
        assert_eq!(
            provider.channel_ref(channel.id).unwrap().name,
            "closed-support-bob"
        );
    }

    #[tokio::test]
    async fn test_lookup_role_is_group_scoped() {
        let provider = MemoryProvider::new().with_role(GROUP, RoleId::new(4), "Staff");

        let role = provider.lookup_role(GROUP, RoleId::new(4)).await.unwrap().unwrap();
        assert_eq!(role.mention(), "<@&4>");
        assert!(provider
            .lookup_role(GroupId::new(2), RoleId::new(4))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_requests_are_not_kept_unless_recording() {
        let provider = MemoryProvider::new().with_category(GROUP, CATEGORY);

        let channel = provider.provision_channel(&request("support-ayse")).await.unwrap();
        provider
            .send_message(channel.id, &MessageContent::text("hello"))
            .await
            .unwrap();

        assert!(provider.calls().is_empty());
        assert_eq!(provider.call_count(ProviderOp::SendMessage), 0);
        assert_eq!(provider.messages(channel.id).len(), 1);
    }

    #[test]
    fn test_observe_channel_keeps_id_and_existing_name() {
        let provider = MemoryProvider::new();
        let seen = ChannelRef::new(ChannelId::new(5_000), "help");

        provider.observe_channel(GROUP, &seen);
        provider.observe_channel(GROUP, &ChannelRef::new(ChannelId::new(5_000), "stale"));

        assert_eq!(provider.channel_ref(seen.id), Some(seen));
        let next = provider.add_channel(GROUP, "other");
        assert!(next.id > ChannelId::new(5_000));
    }
}
