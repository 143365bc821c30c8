//! API key pool
//!
//! Keys are handed out round-robin. A key the provider rejects is retired for
//! the rest of the run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// Shared pool of provider credentials
#[derive(Debug, Default)]
pub struct CredentialPool {
    keys: Mutex<Vec<String>>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Creates a pool, dropping blank and duplicate keys
    pub fn new(keys: impl IntoIterator<Item = String>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for key in keys {
            let key = key.trim().to_string();
            if !key.is_empty() && !unique.contains(&key) {
                unique.push(key);
            }
        }
        Self {
            keys: Mutex::new(unique),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns the next key, or None once every key was retired
    pub fn draw(&self) -> Option<String> {
        let keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        if keys.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % keys.len();
        Some(keys[index].clone())
    }

    /// Removes a key from the pool; false if it was already gone
    pub fn retire(&self, key: &str) -> bool {
        let mut keys = self.keys.lock().unwrap_or_else(PoisonError::into_inner);
        match keys.iter().position(|k| k == key) {
            Some(index) => {
                keys.remove(index);
                tracing::warn!(
                    "Retired credential {}, {} remaining",
                    mask(key),
                    keys.len()
                );
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Masks a credential for logging, keeping the last four characters
pub fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
