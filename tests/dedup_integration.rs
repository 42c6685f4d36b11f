//! Integration tests for the deduplication dispatcher.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use qonduit::services::dedup::{DedupConfig, KeyStrategy};
use qonduit::{ConversationContext, RequestDeduplicator};

#[tokio::test]
async fn test_many_concurrent_callers_share_one_execution() {
    let dedup: Arc<RequestDeduplicator<String>> =
        Arc::new(RequestDeduplicator::new(DedupConfig::default()));
    let executions = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..16 {
        let dedup = Arc::clone(&dedup);
        let executions = Arc::clone(&executions);
        handles.push(tokio::spawn(async move {
            dedup
                .dedupe("what is a qubit?", None, move || async move {
                    executions.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok("a two-level quantum system".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result, "a two-level quantum system");
    }
    assert_eq!(executions.load(Ordering::SeqCst), 1);

    // Settled operations leave no residue
    assert_eq!(dedup.count(), 0);
}

#[tokio::test]
async fn test_context_distinguishes_otherwise_identical_requests() {
    let dedup: Arc<RequestDeduplicator<String>> =
        Arc::new(RequestDeduplicator::new(DedupConfig::default()));
    let executions = Arc::new(AtomicUsize::new(0));

    let novice = ConversationContext {
        expertise_level: Some("novice".to_string()),
        ..ConversationContext::default()
    };
    let expert = ConversationContext {
        expertise_level: Some("expert".to_string()),
        ..ConversationContext::default()
    };

    for context in [&novice, &expert] {
        let executions = Arc::clone(&executions);
        dedup
            .dedupe("explain interference", Some(context), move || async move {
                executions.fetch_add(1, Ordering::SeqCst);
                Ok("answer".to_string())
            })
            .await
            .unwrap();
    }

    assert_eq!(executions.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_sequential_calls_after_settlement_re_execute() {
    let dedup: Arc<RequestDeduplicator<usize>> =
        Arc::new(RequestDeduplicator::new(DedupConfig::default()));
    let executions = Arc::new(AtomicUsize::new(0));

    for expected in 1..=3 {
        let executions = Arc::clone(&executions);
        let value = dedup
            .dedupe("same message", None, move || async move {
                Ok(executions.fetch_add(1, Ordering::SeqCst) + 1)
            })
            .await
            .unwrap();
        assert_eq!(value, expected);
    }
}

#[tokio::test]
async fn test_prefix_collision_coalesces_while_digest_does_not() {
    let shared = "summarize the following transcript of the lab meeting about decoherence ";
    let message_a = format!("{shared}from monday");
    let message_b = format!("{shared}from tuesday");

    // Prefix strategy: second caller joins the first while it is in flight
    let prefix_dedup: Arc<RequestDeduplicator<String>> =
        Arc::new(RequestDeduplicator::new(DedupConfig::default()));
    let prefix_runs = Arc::new(AtomicUsize::new(0));

    let first = {
        let dedup = Arc::clone(&prefix_dedup);
        let runs = Arc::clone(&prefix_runs);
        let message = message_a.clone();
        tokio::spawn(async move {
            dedup
                .dedupe(&message, None, move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok("first".to_string())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let joined = prefix_dedup
        .dedupe(&message_b, None, {
            let runs = Arc::clone(&prefix_runs);
            move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("second".to_string())
            }
        })
        .await
        .unwrap();

    // The colliding key coalesced the second caller onto the first run
    assert_eq!(joined, "first");
    assert_eq!(first.await.unwrap().unwrap(), "first");
    assert_eq!(prefix_runs.load(Ordering::SeqCst), 1);

    // Digest strategy: same shape, but the two messages stay separate
    let digest_dedup: Arc<RequestDeduplicator<String>> = Arc::new(RequestDeduplicator::new(
        DedupConfig::default().with_key_strategy(KeyStrategy::ContentDigest),
    ));
    let digest_runs = Arc::new(AtomicUsize::new(0));

    let first = {
        let dedup = Arc::clone(&digest_dedup);
        let runs = Arc::clone(&digest_runs);
        let message = message_a.clone();
        tokio::spawn(async move {
            dedup
                .dedupe(&message, None, move || async move {
                    runs.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(60)).await;
                    Ok("first".to_string())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    let separate = digest_dedup
        .dedupe(&message_b, None, {
            let runs = Arc::clone(&digest_runs);
            move || async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok("second".to_string())
            }
        })
        .await
        .unwrap();

    assert_eq!(separate, "second");
    assert_eq!(first.await.unwrap().unwrap(), "first");
    assert_eq!(digest_runs.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_expired_entries_age_out_of_pending_set() {
    let dedup: Arc<RequestDeduplicator<String>> = Arc::new(RequestDeduplicator::new(
        DedupConfig::default().with_ttl(Duration::from_millis(40)),
    ));

    // A slow operation outlives its TTL
    let slow = {
        let dedup = Arc::clone(&dedup);
        tokio::spawn(async move {
            dedup
                .dedupe("slow question", None, || async {
                    tokio::time::sleep(Duration::from_millis(120)).await;
                    Ok("slow answer".to_string())
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(dedup.is_pending("slow question", None));

    tokio::time::sleep(Duration::from_millis(60)).await;

    // Past the TTL the entry no longer counts as pending, and a fresh
    // call starts its own execution instead of joining the stale one
    assert!(!dedup.is_pending("slow question", None));
    let fresh = dedup
        .dedupe("slow question", None, || async {
            Ok("fresh answer".to_string())
        })
        .await
        .unwrap();
    assert_eq!(fresh, "fresh answer");

    // The original caller still receives its own result
    assert_eq!(slow.await.unwrap().unwrap(), "slow answer");
}
