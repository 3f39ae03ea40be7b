use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::gateway::Gateway;
use crate::languages::{AUTO_DETECT, is_auto};
use crate::providers::Provider;
use crate::session::{SharedSession, lock};
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionPhase {
    Idle,
    Debouncing(String),
    Detecting(String),
}

#[derive(Debug)]
struct PendingDetection {
    /// Bumped on every schedule or cancel; results carrying an older token
    /// are dropped.
    token: u64,
    phase: DetectionPhase,
    timer: Option<JoinHandle<()>>,
}

struct DetectionInner<P: Provider> {
    gateway: Arc<Gateway<P>>,
    session: SharedSession,
    pending: Mutex<PendingDetection>,
    debounce: Duration,
    min_chars: usize,
    fallback_lang: String,
}

/// Lock order is always `pending` before `session`.
pub struct DetectionCoordinator<P: Provider> {
    inner: Arc<DetectionInner<P>>,
}

impl<P: Provider> DetectionCoordinator<P> {
    pub fn new(gateway: Arc<Gateway<P>>, session: SharedSession, settings: &Settings) -> Self {
        Self {
            inner: Arc::new(DetectionInner {
                gateway,
                session,
                pending: Mutex::new(PendingDetection {
                    token: 0,
                    phase: DetectionPhase::Idle,
                    timer: None,
                }),
                debounce: settings.debounce,
                min_chars: settings.min_detect_chars,
                fallback_lang: settings.fallback_source_lang.clone(),
            }),
        }
    }

    pub fn phase(&self) -> DetectionPhase {
        lock(&self.inner.pending).phase.clone()
    }

    pub fn on_input_changed(&self) {
        let snapshot = {
            let mut session = lock(&self.inner.session);
            let trimmed = session.input_text.trim();
            if trimmed.is_empty() && !is_auto(&session.source_lang) {
                debug!("input cleared; source language reset to auto");
                session.source_lang = AUTO_DETECT.to_string();
            }
            let long_enough = session.input_text.trim().chars().count() > self.inner.min_chars;
            if is_auto(&session.source_lang) && long_enough {
                Some(session.input_text.clone())
            } else {
                None
            }
        };
        match snapshot {
            Some(snapshot) => self.schedule(snapshot),
            None => self.cancel(),
        }
    }

    pub fn on_source_changed(&self) {
        let source_is_auto = is_auto(&lock(&self.inner.session).source_lang);
        if source_is_auto {
            self.on_input_changed();
        } else {
            self.cancel();
        }
    }

    pub fn cancel(&self) {
        let mut pending = lock(&self.inner.pending);
        if Self::reset(&mut pending) {
            lock(&self.inner.session).is_detecting_language = false;
        }
    }

    fn schedule(&self, snapshot: String) {
        let mut pending = lock(&self.inner.pending);
        if Self::reset(&mut pending) {
            lock(&self.inner.session).is_detecting_language = false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!("no async runtime; language detection skipped");
            return;
        };
        let token = pending.token;
        pending.phase = DetectionPhase::Debouncing(snapshot.clone());
        let inner = Arc::clone(&self.inner);
        pending.timer = Some(runtime.spawn(async move {
            sleep(inner.debounce).await;
            inner.detect(token, snapshot).await;
        }));
    }

    /// Returns the slot to idle and invalidates its token. Only a timer that
    /// has not fired yet is aborted; an issued request runs to completion and
    /// its result is discarded. Returns whether a request was in flight.
    fn reset(pending: &mut PendingDetection) -> bool {
        let was_detecting = matches!(pending.phase, DetectionPhase::Detecting(_));
        if let Some(timer) = pending.timer.take()
            && matches!(pending.phase, DetectionPhase::Debouncing(_))
        {
            timer.abort();
        }
        pending.token = pending.token.wrapping_add(1);
        pending.phase = DetectionPhase::Idle;
        was_detecting
    }
}

impl<P: Provider> Drop for DetectionCoordinator<P> {
    fn drop(&mut self) {
        let mut pending = lock(&self.inner.pending);
        Self::reset(&mut pending);
    }
}

impl<P: Provider> DetectionInner<P> {
    async fn detect(&self, token: u64, snapshot: String) {
        {
            let mut pending = lock(&self.pending);
            if pending.token != token {
                return;
            }
            pending.phase = DetectionPhase::Detecting(snapshot.clone());
            lock(&self.session).is_detecting_language = true;
        }

        debug!(chars = snapshot.chars().count(), "detecting source language");
        let result = self.gateway.detect_language(&snapshot).await;

        let mut pending = lock(&self.pending);
        if pending.token != token {
            debug!("detection superseded; result discarded");
            return;
        }
        pending.phase = DetectionPhase::Idle;
        pending.timer = None;

        let mut session = lock(&self.session);
        session.is_detecting_language = false;
        if !is_auto(&session.source_lang) {
            debug!("source language chosen during detection; result discarded");
            return;
        }
        let code = match result {
            Ok(code) => {
                info!(source = code.as_str(), "source language detected");
                code
            }
            Err(err) => {
                warn!(
                    fallback = self.fallback_lang.as_str(),
                    "language detection failed: {}", err
                );
                self.fallback_lang.clone()
            }
        };
        session.source_lang = code;
        session.reconcile_target(self.gateway.catalog());
    }
}
