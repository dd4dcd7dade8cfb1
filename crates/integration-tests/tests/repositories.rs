//! Repository behavior against a real database.
//!
//! These tests require a `PostgreSQL` database reachable through
//! `TEST_DATABASE_URL` (or `DATABASE_URL`). Migrations are applied on
//! connect. Each test works on its own visitor and email addresses, so the
//! suite can share a database with other data.
//!
//! Run with: cargo test -p lavistique-integration-tests -- --ignored

#![allow(clippy::unwrap_used)]

use sqlx::PgPool;

use lavistique_core::{ContactStatus, Email, MessageRole, TicketStatus, VisitorId};
use lavistique_storefront::db::{ContactRepository, ConversationRepository, TicketRepository};

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    sqlx::migrate!("../storefront/migrations").run(&pool).await.unwrap();
    pool
}

/// A fresh address so runs never collide.
fn unique_email(prefix: &str) -> Email {
    Email::parse(&format!("{prefix}-{}@lavistique.test", VisitorId::new())).unwrap()
}

/// A conversation for a new visitor, with its email set.
async fn conversation(pool: &PgPool, email: &Email) -> lavistique_core::ConversationId {
    ConversationRepository::new(pool)
        .get_or_create(VisitorId::new(), Some(email))
        .await
        .unwrap()
        .conversation
        .id
}

// ============================================================================
// Contacts
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_subscribe_creates_then_finds_contact() {
    let pool = pool().await;
    let repo = ContactRepository::new(&pool);
    let email = unique_email("new");

    let first = repo
        .subscribe(&email, Some("Bella"), None, None, None)
        .await
        .unwrap();
    assert!(first.is_new);

    let second = repo.subscribe(&email, None, None, None, None).await.unwrap();
    assert!(!second.is_new);
    assert_eq!(second.contact_id, first.contact_id);

    let contact = repo.get_by_email(&email).await.unwrap().unwrap().contact;
    assert_eq!(contact.status, ContactStatus::Subscribed);
    assert_eq!(contact.first_name.as_deref(), Some("Bella"));
    assert!(contact.consented_at.is_some());
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_unsubscribed_contact_is_resubscribed() {
    let pool = pool().await;
    let repo = ContactRepository::new(&pool);
    let email = unique_email("resub");

    repo.subscribe(&email, None, None, Some("footer"), None)
        .await
        .unwrap();
    let before = repo.get_by_email(&email).await.unwrap().unwrap().contact;
    repo.unsubscribe(&email).await.unwrap();
    assert_eq!(
        repo.get_by_email(&email).await.unwrap().unwrap().contact.status,
        ContactStatus::Unsubscribed
    );

    let result = repo
        .subscribe(&email, None, None, Some("checkout"), None)
        .await
        .unwrap();
    assert!(!result.is_new);

    let after = repo.get_by_email(&email).await.unwrap().unwrap().contact;
    assert_eq!(after.id, before.id);
    assert_eq!(after.status, ContactStatus::Subscribed);
    assert_eq!(after.source, "checkout");
    assert!(after.consented_at > before.consented_at);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_concurrent_first_signups_share_one_contact() {
    let pool = pool().await;
    let email = unique_email("race");

    let signups = (0..8).map(|_| {
        let pool = pool.clone();
        let email = email.clone();
        tokio::spawn(async move {
            ContactRepository::new(&pool)
                .subscribe(&email, None, None, None, None)
                .await
        })
    });

    let mut results = Vec::new();
    for handle in signups {
        results.push(handle.await.unwrap().unwrap());
    }
    assert_eq!(results.iter().filter(|r| r.is_new).count(), 1);
    assert!(results.iter().all(|r| r.contact_id == results[0].contact_id));
}

// ============================================================================
// Tickets
// ============================================================================

#[tokio::test]
#[ignore = "Requires database"]
async fn test_pending_ticket_is_reused() {
    let pool = pool().await;
    let repo = TicketRepository::new(&pool);
    let email = unique_email("ticket");
    let conversation = conversation(&pool, &email).await;

    let created = repo
        .create_for_conversation(conversation, &email, None, Some("Wrong frame"))
        .await
        .unwrap();
    assert!(!created.is_existing);
    assert_eq!(created.ticket.subject, "Support Request");
    assert_eq!(created.ticket.status, TicketStatus::Pending);

    let again = repo
        .create_for_conversation(conversation, &email, Some("Still waiting"), None)
        .await
        .unwrap();
    assert!(again.is_existing);
    assert_eq!(again.ticket.id, created.ticket.id);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_reply_moves_ticket_in_progress() {
    let pool = pool().await;
    let repo = TicketRepository::new(&pool);
    let email = unique_email("reply");
    let conversation = conversation(&pool, &email).await;
    let ticket = repo
        .create_for_conversation(conversation, &email, None, None)
        .await
        .unwrap()
        .ticket;

    let (ticket, message) = repo
        .reply(ticket.id, "Your portrait ships Monday.", Some("Anna"))
        .await
        .unwrap();
    assert_eq!(ticket.status, TicketStatus::InProgress);
    assert_eq!(message.role, MessageRole::Staff);

    let metadata = message.metadata.unwrap();
    assert_eq!(metadata["staffName"], "Anna");
    assert_eq!(metadata["ticketId"], ticket.id.to_string());

    let (_, message) = repo.reply(ticket.id, "Tracking attached.", None).await.unwrap();
    assert_eq!(message.metadata.unwrap()["staffName"], "Support Team");
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_internal_notes_are_appended() {
    let pool = pool().await;
    let repo = TicketRepository::new(&pool);
    let email = unique_email("notes");
    let conversation = conversation(&pool, &email).await;
    let ticket = repo
        .create_for_conversation(conversation, &email, None, None)
        .await
        .unwrap()
        .ticket;

    repo.add_internal_note(ticket.id, "Called customer").await.unwrap();
    let ticket = repo
        .add_internal_note(ticket.id, "Sent replacement")
        .await
        .unwrap();

    let notes = ticket.internal_notes.unwrap();
    let entries: Vec<&str> = notes.split("\n\n").collect();
    assert_eq!(entries.len(), 2);
    assert!(entries[0].starts_with('[') && entries[0].ends_with("] Called customer"));
    assert!(entries[1].ends_with("] Sent replacement"));
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_ticket_detail_has_whole_conversation() {
    let pool = pool().await;
    let email = unique_email("long");
    let conversation = conversation(&pool, &email).await;

    let conversations = ConversationRepository::new(&pool);
    for i in 0..150 {
        conversations
            .add_message(conversation, MessageRole::User, &format!("message {i}"), None)
            .await
            .unwrap();
    }

    let repo = TicketRepository::new(&pool);
    let ticket = repo
        .create_for_conversation(conversation, &email, None, None)
        .await
        .unwrap()
        .ticket;

    let messages = repo.get(ticket.id).await.unwrap().unwrap().conversation.unwrap().messages;
    assert_eq!(messages.len(), 150);
    assert_eq!(messages[0].content, "message 0");
    assert_eq!(messages[149].content, "message 149");
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_stats_count_each_status() {
    let pool = pool().await;
    let repo = TicketRepository::new(&pool);
    let before = repo.stats().await.unwrap();

    let email = unique_email("stats");
    let resolved = repo
        .create_for_conversation(conversation(&pool, &email).await, &email, None, None)
        .await
        .unwrap()
        .ticket;
    repo.resolve(resolved.id).await.unwrap();
    let closed = repo
        .create_for_conversation(conversation(&pool, &email).await, &email, None, None)
        .await
        .unwrap()
        .ticket;
    repo.update_status(closed.id, TicketStatus::Closed).await.unwrap();

    let after = repo.stats().await.unwrap();
    assert_eq!(
        after.total,
        after.pending + after.in_progress + after.resolved + after.closed
    );
    assert!(after.resolved > before.resolved);
    assert!(after.closed > before.closed);
    assert!(after.total >= before.total + 2);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_pending_queue_is_newest_first() {
    let pool = pool().await;
    let repo = TicketRepository::new(&pool);
    let email = unique_email("queue");

    let older = repo
        .create_for_conversation(conversation(&pool, &email).await, &email, None, None)
        .await
        .unwrap()
        .ticket;
    let newer = repo
        .create_for_conversation(conversation(&pool, &email).await, &email, None, None)
        .await
        .unwrap()
        .ticket;

    let queue = repo.pending(Some(100)).await.unwrap();
    let position = |id| queue.iter().position(|summary| summary.ticket.id == id);
    assert!(position(newer.id).unwrap() < position(older.id).unwrap());
    assert!(
        queue
            .windows(2)
            .all(|pair| pair[0].ticket.created_at >= pair[1].ticket.created_at)
    );
}
