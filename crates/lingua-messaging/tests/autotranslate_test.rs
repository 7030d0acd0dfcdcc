mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use lingua_messaging::{
    AutoTranslator, BackfillReport, MessageComposer, RateLimiter, SealedEnvelopeEncryptor, SkipReason,
    WordListModerator,
};
use lingua_types::models::{AutoTranslateMode, Message, MessageOptions, Plan};

use common::{EchoProvider, MemoryStore, ScriptedLimiter, TestUser, engine_with, user};

struct Room {
    store: Arc<MemoryStore>,
    provider: Arc<EchoProvider>,
    sender: TestUser,
    message: Message,
}

/// Seeds a room with the sender speaking `en` plus one member per language,
/// and stores one message through the composer with no provider so the
/// stored translations are pass-through.
async fn room_with(mode: AutoTranslateMode, languages: &[&str], provider: EchoProvider) -> Room {
    let store = Arc::new(MemoryStore::default());
    let sender = user("sender", "en", Plan::Free, None);
    let members: Vec<TestUser> = languages
        .iter()
        .enumerate()
        .map(|(i, lang)| user(&format!("member{i}"), lang, Plan::Free, None))
        .collect();
    let mut everyone = vec![&sender];
    everyone.extend(members.iter());
    let room_id = store.add_room(mode, &everyone);

    let composer = MessageComposer::new(
        store.clone(),
        store.clone(),
        Arc::new(WordListModerator::default()),
        Arc::new(SealedEnvelopeEncryptor),
        engine_with(None),
    );
    let composed = composer
        .create_message(sender.profile.user_id, room_id, "good morning", MessageOptions::default())
        .await
        .unwrap();

    store.participant_reads.store(0, Ordering::SeqCst);
    store.mode_reads.store(0, Ordering::SeqCst);

    Room {
        store,
        provider: Arc::new(provider),
        sender,
        message: composed.message,
    }
}

fn translator(room: &Room, provider: Option<Arc<EchoProvider>>, limiter: Arc<dyn RateLimiter>) -> AutoTranslator {
    AutoTranslator::new(engine_with(provider), room.store.clone(), room.store.clone(), limiter)
}

#[tokio::test]
async fn auto_translate_on_fills_every_room_language() {
    let room = room_with(AutoTranslateMode::On, &["es"], EchoProvider::default()).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(
        report,
        BackfillReport::Completed {
            translated: vec!["en".into(), "es".into()],
            failed: vec![],
            rate_limited: vec![],
        }
    );
    let stored = room.store.message(room.message.id).unwrap();
    assert_eq!(stored.translations["en"], "en:good morning");
    assert_eq!(stored.translations["es"], "es:good morning");
    assert_eq!(room.provider.calls(), 2);
    assert_eq!(room.sender.profile.preferred_language, "en");
}

#[tokio::test]
async fn auto_translate_off_makes_no_provider_or_member_calls() {
    let room = room_with(AutoTranslateMode::Off, &["es", "fr"], EchoProvider::default()).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(report, BackfillReport::Skipped(SkipReason::AutoTranslateOff));
    assert_eq!(room.provider.calls(), 0);
    assert_eq!(room.store.participant_reads.load(Ordering::SeqCst), 0);
    assert_eq!(room.store.merges.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_provider_skips_before_touching_the_store() {
    let room = room_with(AutoTranslateMode::On, &["es"], EchoProvider::default()).await;
    let auto = translator(&room, None, Arc::new(ScriptedLimiter::default()));

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(report, BackfillReport::Skipped(SkipReason::NoProvider));
    assert_eq!(room.store.mode_reads.load(Ordering::SeqCst), 0);
    assert_eq!(room.store.participant_reads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn room_rate_limit_skips_member_lookup() {
    let room = room_with(AutoTranslateMode::On, &["es"], EchoProvider::default()).await;
    let room_key = format!("translate:{}", room.message.chat_room_id);
    let auto = translator(
        &room,
        Some(room.provider.clone()),
        Arc::new(ScriptedLimiter::denying(&[room_key])),
    );

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(report, BackfillReport::Skipped(SkipReason::RoomRateLimited));
    assert_eq!(room.store.participant_reads.load(Ordering::SeqCst), 0);
    assert_eq!(room.provider.calls(), 0);
}

#[tokio::test]
async fn language_rate_limit_omits_only_that_language() {
    let room = room_with(AutoTranslateMode::On, &["es", "de"], EchoProvider::default()).await;
    let de_key = format!("translate:{}:de", room.message.chat_room_id);
    let limiter = Arc::new(ScriptedLimiter::denying(&[de_key.clone()]));
    let auto = translator(&room, Some(room.provider.clone()), limiter.clone());

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(
        report,
        BackfillReport::Completed {
            translated: vec!["en".into(), "es".into()],
            failed: vec![],
            rate_limited: vec!["de".into()],
        }
    );
    let stored = room.store.message(room.message.id).unwrap();
    // Pass-through text from send time is left alone for the limited language.
    assert_eq!(stored.translations["de"], "good morning");
    assert_eq!(stored.translations["es"], "es:good morning");
    assert!(limiter.checks.lock().unwrap().contains(&de_key));
}

#[tokio::test]
async fn provider_failure_omits_that_language_only() {
    let room = room_with(AutoTranslateMode::On, &["es", "ja"], EchoProvider::failing_on(&["ja"])).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));

    let report = auto.backfill(&room.message).await.unwrap();

    assert_eq!(
        report,
        BackfillReport::Completed {
            translated: vec!["en".into(), "es".into()],
            failed: vec!["ja".into()],
            rate_limited: vec![],
        }
    );
    let stored = room.store.message(room.message.id).unwrap();
    assert_eq!(stored.translations["es"], "es:good morning");
    assert_eq!(stored.translations["ja"], "good morning");
    assert_eq!(room.store.merges.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn all_languages_failing_skips_the_merge() {
    let room = room_with(AutoTranslateMode::On, &[], EchoProvider::failing_on(&["en"])).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));

    let report = auto.backfill(&room.message).await.unwrap();

    assert!(matches!(report, BackfillReport::Completed { ref failed, .. } if failed == &vec!["en".to_string()]));
    assert_eq!(room.store.merges.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn spawned_backfill_completes_detached() {
    let room = room_with(AutoTranslateMode::On, &["it"], EchoProvider::default()).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));

    auto.spawn(room.message.clone()).await.unwrap();

    let stored = room.store.message(room.message.id).unwrap();
    assert_eq!(stored.translations["it"], "it:good morning");
}

#[tokio::test]
async fn media_only_message_is_skipped_before_any_lookup() {
    let room = room_with(AutoTranslateMode::On, &["es"], EchoProvider::default()).await;
    let auto = translator(&room, Some(room.provider.clone()), Arc::new(ScriptedLimiter::default()));
    let media_only = Message {
        raw_content: String::new(),
        image_url: Some("https://cdn.example/cat.png".into()),
        ..room.message.clone()
    };

    let report = auto.backfill(&media_only).await.unwrap();

    assert_eq!(report, BackfillReport::Skipped(SkipReason::NoText));
    assert_eq!(room.provider.calls(), 0);
    assert_eq!(room.store.mode_reads.load(Ordering::SeqCst), 0);
    assert_eq!(room.store.participant_reads.load(Ordering::SeqCst), 0);
    assert_eq!(room.store.merges.load(Ordering::SeqCst), 0);
}
