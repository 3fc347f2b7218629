use crate::remote::RemoteTable;
use crate::store::QuestStore;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Mutex<QuestStore>>,
    pub remote: Option<RemoteTable>,
}

impl AppState {
    pub fn new(store: QuestStore, remote: Option<RemoteTable>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            remote,
        }
    }
}
