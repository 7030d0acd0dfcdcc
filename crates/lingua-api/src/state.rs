use std::sync::Arc;

use lingua_messaging::{AutoTranslator, MessageComposer};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub composer: MessageComposer,
    pub auto_translator: AutoTranslator,
    pub jwt_secret: String,
}
