//! End-to-end ticket lifecycle against the file store and the in-memory
//! provider

use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use ticket_desk::core::{
    Actor, ActorBuilder, CategoryId, ChannelId, GroupId, RoleId, Status, UserId,
};
use ticket_desk::interaction::{Interaction, InteractionContext, dispatch};
use ticket_desk::lifecycle::{CloseOutcome, DeskSettings, LifecycleManager};
use ticket_desk::provider::{
    ChannelProvider, ChannelRef, MemoryProvider, OverwriteTarget, Permission, ProviderOp,
};
use ticket_desk::storage::{FileStorage, TicketRepository};
use ticket_desk::TicketDeskError;

const GROUP: GroupId = GroupId::new(500);
const CATEGORY: CategoryId = CategoryId::new(501);
const SUPPORT: RoleId = RoleId::new(502);
const STAFF: RoleId = RoleId::new(503);

struct Desk {
    temp_dir: TempDir,
    store: Arc<FileStorage>,
    provider: Arc<MemoryProvider>,
    manager: LifecycleManager,
}

fn desk() -> Desk {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(FileStorage::open(temp_dir.path().join("tickets.yaml")).unwrap());
    let provider = Arc::new(
        MemoryProvider::new()
            .recording()
            .with_category(GROUP, CATEGORY)
            .with_role(GROUP, SUPPORT, "Support")
            .with_role(GROUP, STAFF, "Staff"),
    );
    let settings = DeskSettings {
        group: GROUP,
        category: CATEGORY,
        support_role: SUPPORT,
        authority_role: STAFF,
        ticket_prefix: "support".to_string(),
        closed_prefix: "closed".to_string(),
        provider_timeout: Duration::from_secs(2),
    };
    let manager = LifecycleManager::new(store.clone(), provider.clone(), settings);
    Desk {
        temp_dir,
        store,
        provider,
        manager,
    }
}

fn user(id: u64, name: &str) -> Actor {
    ActorBuilder::new(UserId::new(id)).name(name).build()
}

fn agent(id: u64) -> Actor {
    ActorBuilder::new(UserId::new(id))
        .name("agent")
        .role(SUPPORT)
        .build()
}

#[tokio::test]
async fn test_owner_opens_sets_pending_and_support_closes() {
    let desk = desk();
    let owner = user(1, "U1");

    let created = desk.manager.create_ticket(&owner).await.unwrap();
    let c1 = created.channel.id;
    let row = desk.store.get(c1).await.unwrap().unwrap();
    assert_eq!((row.owner_id, row.status), (owner.id, Status::Open));

    desk.manager
        .change_status(c1, &owner, Some(&created.card), "Pending")
        .await
        .unwrap();
    let row = desk.store.get(c1).await.unwrap().unwrap();
    assert_eq!((row.owner_id, row.status), (owner.id, Status::Pending));

    let outcome = desk
        .manager
        .close_ticket(&created.channel, &agent(2), Some(&created.card))
        .await
        .unwrap();
    assert!(matches!(outcome, CloseOutcome::Closed { .. }));
    assert_eq!(desk.store.get_status(c1).await.unwrap(), Status::Closed);
    assert_eq!(desk.provider.call_count(ProviderOp::RenameChannel), 1);
    assert_eq!(desk.provider.call_count(ProviderOp::UpdateChannelVisibility), 1);

    let channel = desk.provider.channel(c1).unwrap();
    assert_eq!(channel.name, "closed-support-u1");
    let everyone = channel
        .overwrites
        .iter()
        .find(|o| o.target == OverwriteTarget::Everyone)
        .unwrap();
    assert!(everyone.denies(Permission::ViewChannel));
}

#[tokio::test]
async fn test_status_writes_survive_reopening_the_store() {
    let desk = desk();
    let owner = user(1, "U1");
    let created = desk.manager.create_ticket(&owner).await.unwrap();
    desk.manager
        .change_status(created.channel.id, &owner, None, "resolved")
        .await
        .unwrap();

    let reopened = FileStorage::open(desk.temp_dir.path().join("tickets.yaml")).unwrap();
    assert_eq!(
        reopened.get_status(created.channel.id).await.unwrap(),
        Status::Resolved
    );
    assert_eq!(
        reopened.active_for_owner(owner.id).await.unwrap(),
        Some(created.channel.id)
    );
}

#[tokio::test]
async fn test_one_open_ticket_per_owner_even_after_rename() {
    let desk = desk();
    let owner = user(1, "U1");
    let created = desk.manager.create_ticket(&owner).await.unwrap();

    // A moderator renames the channel by hand; the owner index still knows it
    desk.provider
        .rename_channel(created.channel.id, "urgent-u1")
        .await
        .unwrap();
    let err = desk.manager.create_ticket(&owner).await.unwrap_err();

    assert!(matches!(err, TicketDeskError::AlreadyExists { channel } if channel == created.channel.id));
    assert_eq!(desk.provider.call_count(ProviderOp::ProvisionChannel), 1);
}

#[tokio::test]
async fn test_tickets_of_different_owners_are_independent() {
    let desk = desk();
    let a = user(1, "Ayse");
    let b = user(2, "Bora");

    let (ta, tb) = tokio::join!(desk.manager.create_ticket(&a), desk.manager.create_ticket(&b));
    let (ta, tb) = (ta.unwrap(), tb.unwrap());
    assert_ne!(ta.channel.id, tb.channel.id);

    let (sa, sb) = tokio::join!(
        desk.manager.change_status(ta.channel.id, &a, None, "Pending"),
        desk.manager.change_status(tb.channel.id, &b, None, "Resolved"),
    );
    sa.unwrap();
    sb.unwrap();

    assert_eq!(desk.store.get_status(ta.channel.id).await.unwrap(), Status::Pending);
    assert_eq!(desk.store.get_status(tb.channel.id).await.unwrap(), Status::Resolved);
}

#[tokio::test]
async fn test_same_ticket_status_writes_are_serialized() {
    let desk = desk();
    let owner = user(1, "U1");
    let created = desk.manager.create_ticket(&owner).await.unwrap();
    let channel = created.channel.id;

    let (first, second) = tokio::join!(
        desk.manager.change_status(channel, &owner, Some(&created.card), "Pending"),
        desk.manager.change_status(channel, &owner, Some(&created.card), "Resolved"),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    // Whichever ran second saw the first one's write
    let last = if second.old == first.new { second } else { first };
    assert_eq!(desk.store.get_status(channel).await.unwrap(), last.new);
}

#[tokio::test]
async fn test_summon_with_missing_role_sends_nothing() {
    let desk = desk();
    let created = desk.manager.create_ticket(&user(1, "U1")).await.unwrap();
    let before = desk.provider.call_count(ProviderOp::SendMessage);

    let err = desk
        .manager
        .summon_authority(created.channel.id, &user(1, "U1"), Some(RoleId::new(9)))
        .await
        .unwrap_err();

    assert!(matches!(err, TicketDeskError::RoleNotFound { .. }));
    assert_eq!(desk.provider.call_count(ProviderOp::SendMessage), before);
}

#[tokio::test]
async fn test_every_dispatched_failure_is_acknowledged() {
    let desk = desk();
    let ghost = InteractionContext {
        actor: user(3, "nobody"),
        channel: ChannelRef::new(ChannelId::new(424_242), "support-nobody"),
        message: None,
    };

    for interaction in [
        Interaction::Close,
        Interaction::Summon,
        Interaction::StatusChange("Bogus".to_string()),
        Interaction::StartSupportFlow,
    ] {
        let ack = dispatch(&desk.manager, interaction, &ghost).await;
        assert!(!ack.ok);
        assert!(!ack.content.is_empty());
    }
}
