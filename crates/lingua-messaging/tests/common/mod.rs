#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use uuid::Uuid;

use lingua_crypto::keys::{StaticSecret, generate_keypair, key_to_base64};
use lingua_messaging::{
    Envelope, EnvelopeEncryptor, MembershipDirectory, MessageRepository, RateLimiter,
};
use lingua_translate::{
    EngineConfig, ProviderKind, ProviderOutput, TranslateError, TranslationEngine, TranslationProvider,
};
use lingua_types::models::{
    AutoTranslateMode, Message, MessageKey, Participant, Plan, SenderProfile,
};

pub struct TestUser {
    pub profile: SenderProfile,
    pub secret: StaticSecret,
}

pub fn user(name: &str, lang: &str, plan: Plan, auto_delete_seconds: Option<i64>) -> TestUser {
    let (secret, public) = generate_keypair();
    TestUser {
        profile: SenderProfile {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            preferred_language: lang.to_string(),
            allow_explicit_content: false,
            auto_delete_seconds,
            public_key: Some(key_to_base64(public.as_bytes())),
            plan,
        },
        secret,
    }
}

#[derive(Default)]
struct State {
    users: HashMap<Uuid, SenderProfile>,
    rooms: HashMap<Uuid, (AutoTranslateMode, Vec<Uuid>)>,
    messages: HashMap<Uuid, Message>,
    keys: HashMap<(Uuid, Uuid), String>,
}

/// In-memory directory + repository that counts every call.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    pub mode_reads: AtomicUsize,
    pub participant_reads: AtomicUsize,
    pub inserts: AtomicUsize,
    pub merges: AtomicUsize,
    pub fail_insert: AtomicBool,
}

impl MemoryStore {
    pub fn add_room(&self, mode: AutoTranslateMode, members: &[&TestUser]) -> Uuid {
        let room_id = Uuid::new_v4();
        let mut state = self.state.lock().unwrap();
        for member in members {
            state.users.insert(member.profile.user_id, member.profile.clone());
        }
        state
            .rooms
            .insert(room_id, (mode, members.iter().map(|m| m.profile.user_id).collect()));
        room_id
    }

    pub fn add_user(&self, user: &TestUser) {
        let mut state = self.state.lock().unwrap();
        state.users.insert(user.profile.user_id, user.profile.clone());
    }

    pub fn message(&self, id: Uuid) -> Option<Message> {
        self.state.lock().unwrap().messages.get(&id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.state.lock().unwrap().messages.len()
    }

    pub fn keys_for(&self, message_id: Uuid) -> HashMap<Uuid, String> {
        self.state
            .lock()
            .unwrap()
            .keys
            .iter()
            .filter(|((mid, _), _)| *mid == message_id)
            .map(|((_, uid), key)| (*uid, key.clone()))
            .collect()
    }

    pub fn key_rows(&self) -> usize {
        self.state.lock().unwrap().keys.len()
    }
}

#[async_trait]
impl MembershipDirectory for MemoryStore {
    async fn find_sender(&self, user_id: Uuid) -> Result<Option<SenderProfile>> {
        Ok(self.state.lock().unwrap().users.get(&user_id).cloned())
    }

    async fn is_participant(&self, room_id: Uuid, user_id: Uuid) -> Result<bool> {
        let state = self.state.lock().unwrap();
        Ok(state
            .rooms
            .get(&room_id)
            .is_some_and(|(_, members)| members.contains(&user_id)))
    }

    async fn participants(&self, room_id: Uuid) -> Result<Vec<Participant>> {
        self.participant_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        let (_, members) = state.rooms.get(&room_id).ok_or_else(|| anyhow!("no room"))?;
        Ok(members
            .iter()
            .filter_map(|id| state.users.get(id))
            .map(SenderProfile::as_participant)
            .collect())
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn auto_translate_mode(&self, room_id: Uuid) -> Result<AutoTranslateMode> {
        self.mode_reads.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Ok(state
            .rooms
            .get(&room_id)
            .map_or(AutoTranslateMode::Off, |(mode, _)| *mode))
    }

    async fn insert_message(&self, message: &Message, keys: &[MessageKey]) -> Result<()> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        if self.fail_insert.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        let mut state = self.state.lock().unwrap();
        state.messages.insert(message.id, message.clone());
        for key in keys {
            state
                .keys
                .insert((key.message_id, key.user_id), key.wrapped_key.clone());
        }
        Ok(())
    }

    async fn merge_translations(&self, message_id: Uuid, translations: &BTreeMap<String, String>) -> Result<()> {
        self.merges.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let message = state
            .messages
            .get_mut(&message_id)
            .ok_or_else(|| anyhow!("no message {}", message_id))?;
        message
            .translations
            .extend(translations.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

/// Admits every key except the listed ones.
#[derive(Default)]
pub struct ScriptedLimiter {
    denied: HashSet<String>,
    pub checks: Mutex<Vec<String>>,
}

impl ScriptedLimiter {
    pub fn denying(keys: &[String]) -> Self {
        Self {
            denied: keys.iter().cloned().collect(),
            checks: Mutex::default(),
        }
    }
}

impl RateLimiter for ScriptedLimiter {
    fn allow(&self, key: &str) -> bool {
        self.checks.lock().unwrap().push(key.to_string());
        !self.denied.contains(key)
    }
}

pub struct FailingEncryptor;

impl EnvelopeEncryptor for FailingEncryptor {
    fn encrypt_for_recipients(&self, _: &[u8], _: &Participant, _: &[Participant]) -> Result<Envelope> {
        Err(anyhow!("HSM unavailable"))
    }
}

/// Deterministic provider: `"<lang>:<text>"`.
#[derive(Default)]
pub struct EchoProvider {
    pub calls: AtomicUsize,
    pub failing_targets: Vec<String>,
}

impl EchoProvider {
    pub fn failing_on(targets: &[&str]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            failing_targets: targets.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for EchoProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::DeepL
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: Option<&str>,
        target_lang: &str,
    ) -> Result<ProviderOutput, TranslateError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_targets.iter().any(|t| t == target_lang) {
            return Err(TranslateError::bad_gateway(ProviderKind::DeepL, 502, "upstream down"));
        }
        Ok(ProviderOutput {
            text: format!("{target_lang}:{text}"),
            detected_source_lang: Some("en".into()),
        })
    }
}

pub fn engine_with(provider: Option<Arc<EchoProvider>>) -> TranslationEngine {
    TranslationEngine::with_providers(
        provider.map(|p| p as Arc<dyn TranslationProvider>),
        None,
        None,
        EngineConfig::default(),
    )
}
