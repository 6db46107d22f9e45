use std::sync::Arc;

use crate::config::Settings;
use crate::mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub mailer: Arc<dyn Mailer>,
}
