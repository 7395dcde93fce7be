//! # Admin Panel
//!
//! Hospital and doctor management. Drafts are validated locally and then
//! routed to the CRUD endpoint matching their variant.
//!
//! ```text
//! AdminEntityDraft ──validate──┬─ Hospital ──► save_hospital ──► SavedEntity::Hospital
//!                              └─ Doctor   ──► save_doctor   ──► SavedEntity::Doctor
//! ```

use std::sync::Arc;

use carecart_core::admin::AdminEntityDraft;
use carecart_core::types::{Doctor, Hospital};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::CommerceBackend;
use crate::error::{ClientError, ClientResult};
use crate::notify::{NoOpNotifier, Notification, Notifier};
use crate::session::SessionContext;

/// Which admin-managed entity an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Hospital,
    Doctor,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Hospital => write!(f, "hospital"),
            EntityKind::Doctor => write!(f, "doctor"),
        }
    }
}

/// The backend's copy of a saved entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedEntity {
    Hospital(Hospital),
    Doctor(Doctor),
}

impl SavedEntity {
    pub fn id(&self) -> &str {
        match self {
            SavedEntity::Hospital(h) => &h.id,
            SavedEntity::Doctor(d) => &d.id,
        }
    }
}

pub struct AdminService<B> {
    backend: Arc<B>,
    session: SessionContext,
    notifier: Arc<dyn Notifier>,
}

impl<B: CommerceBackend> AdminService<B> {
    pub fn new(backend: Arc<B>, session: SessionContext) -> Self {
        AdminService {
            backend,
            session,
            notifier: Arc::new(NoOpNotifier),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub async fn list_hospitals(&self) -> ClientResult<Vec<Hospital>> {
        let session = self.session.require()?;
        self.backend.list_hospitals(&session.token).await
    }

    pub async fn list_doctors(&self) -> ClientResult<Vec<Doctor>> {
        let session = self.session.require()?;
        self.backend.list_doctors(&session.token).await
    }

    /// Doctors practising at one hospital.
    pub async fn doctors_at(&self, hospital_id: &str) -> ClientResult<Vec<Doctor>> {
        let mut doctors = self.list_doctors().await?;
        doctors.retain(|d| d.hospital_id == hospital_id);
        Ok(doctors)
    }

    /// Creates or updates the entity behind `draft`.
    ///
    /// Validation failures are returned before any request is made.
    pub async fn save(&self, draft: &AdminEntityDraft) -> ClientResult<SavedEntity> {
        let draft = draft.validate()?;
        let session = self.session.require()?;
        let creating = draft.is_new();
        debug!(kind = draft.kind(), creating, "Saving admin entity");

        let saved = match &draft {
            AdminEntityDraft::Hospital(h) => self
                .backend
                .save_hospital(&session.token, h)
                .await
                .map(SavedEntity::Hospital),
            AdminEntityDraft::Doctor(d) => self
                .backend
                .save_doctor(&session.token, d)
                .await
                .map(SavedEntity::Doctor),
        }
        .map_err(|e| self.reported(e))?;

        info!(kind = draft.kind(), id = saved.id(), creating, "Admin entity saved");
        let verb = if creating { "created" } else { "updated" };
        self.notifier.notify(Notification::success(
            "Saved",
            format!("The {} was {verb}.", draft.kind()),
        ));
        Ok(saved)
    }

    pub async fn delete(&self, kind: EntityKind, id: &str) -> ClientResult<()> {
        let session = self.session.require()?;
        let result = match kind {
            EntityKind::Hospital => self.backend.delete_hospital(&session.token, id).await,
            EntityKind::Doctor => self.backend.delete_doctor(&session.token, id).await,
        };
        result.map_err(|e| self.reported(e))?;

        info!(%kind, id, "Admin entity deleted");
        self.notifier
            .notify(Notification::success("Deleted", format!("The {kind} was removed.")));
        Ok(())
    }

    fn reported(&self, err: ClientError) -> ClientError {
        warn!(error = %err, "Admin request failed");
        if !err.is_auth() {
            self.notifier.notify(Notification::from_error(&err));
        }
        err
    }
}
