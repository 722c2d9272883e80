// ── Session registry ──
//
// One `Handy` facade per user id. Facades are never shared between
// users; the registry only routes lookups.

use std::sync::Arc;

use dashmap::DashMap;

use crate::config::SessionConfig;
use crate::facade::Handy;

#[derive(Debug, Default)]
pub struct SessionRegistry {
    config: SessionConfig,
    sessions: DashMap<String, Arc<Handy>>,
}

impl SessionRegistry {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: DashMap::new(),
        }
    }

    /// The facade for `user_id`, created unpaired on first use.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Handy> {
        self.sessions
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Handy::new(self.config.clone())))
            .clone()
    }

    pub fn get(&self, user_id: &str) -> Option<Arc<Handy>> {
        self.sessions.get(user_id).map(|entry| Arc::clone(&entry))
    }

    /// Remove and unpair the user's facade.
    pub fn remove(&self, user_id: &str) -> bool {
        match self.sessions.remove(user_id) {
            Some((_, handy)) => {
                handy.unpair();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn user_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}
