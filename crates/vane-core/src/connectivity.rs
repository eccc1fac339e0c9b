//! Network connectivity with captive-portal fallback
//!
//! ```text
//! Disconnected ──► Connecting ──► Connected
//!                      │
//!                      ▼
//!                 PortalOpen ──► PortalAccepted ──► Connected
//!                      │
//!                      ▼
//!                 PortalTimeout   (terminal for this wake)
//! ```
//!
//! The portal is bounded by the timeout passed to
//! [`ConnectivityManager::ensure_connected`]; the manager enforces it itself
//! instead of relying on the portal implementation to give up.

use core::future::Future;

use alloc::string::String;
use embassy_time::{Duration, with_timeout};
use log::{error, info, warn};
use thiserror_no_std::Error;

use crate::app_state::FromTruncated;
use crate::config::{FieldString, Settings, SettingsStorage, SettingsStore, default_city};

/// How long the provisioning portal stays open
pub const PORTAL_TIMEOUT: Duration = Duration::from_secs(180);

/// Access-point name the portal advertises
pub const PORTAL_AP_NAME: &str = "EPD-Setup";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    PortalOpen,
    PortalAccepted,
    PortalTimeout,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    #[error("no stored network credentials")]
    NoCredentials,
    #[error("association with the access point failed")]
    Association,
    #[error("no IP address assigned")]
    NoAddress,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalError {
    #[error("portal could not be started")]
    Start,
    #[error("submitted network credentials did not connect")]
    JoinFailed,
}

/// Station-mode network link using whatever credentials the platform holds
pub trait NetworkLink {
    fn connect(&mut self) -> impl Future<Output = Result<(), LinkError>>;
}

/// Values the portal form is pre-filled with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortalForm {
    pub api_key: FieldString,
    pub city: FieldString,
}

/// Raw values accepted in the portal form, before any cleanup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortalSubmission {
    pub api_key: String,
    pub city: String,
}

/// Interactive provisioning collaborator.
///
/// `serve` returns once the user has submitted the form and the device has
/// joined the network with the submitted credentials.
pub trait ProvisioningPortal {
    fn serve(
        &mut self,
        form: &PortalForm,
    ) -> impl Future<Output = Result<PortalSubmission, PortalError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityOutcome {
    Connected(Settings),
    PortalTimeout,
}

pub struct ConnectivityManager<L, P> {
    link: L,
    portal: P,
    state: LinkState,
}

impl<L: NetworkLink, P: ProvisioningPortal> ConnectivityManager<L, P> {
    pub fn new(link: L, portal: P) -> Self {
        Self {
            link,
            portal,
            state: LinkState::Disconnected,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    fn transition(&mut self, next: LinkState) {
        info!("Link: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Bring the network up, opening the provisioning portal if the stored
    /// credentials do not work.
    ///
    /// On a successful portal run the revised settings are returned and, when
    /// they carry a new API key or a changed city, persisted through `store`.
    pub async fn ensure_connected<S: SettingsStorage>(
        &mut self,
        existing: Settings,
        timeout: Duration,
        store: &mut SettingsStore<S>,
    ) -> ConnectivityOutcome {
        self.transition(LinkState::Connecting);
        match self.link.connect().await {
            Ok(()) => {
                self.transition(LinkState::Connected);
                return ConnectivityOutcome::Connected(existing);
            }
            Err(e) => warn!("WiFi: {}; opening portal '{}'", e, PORTAL_AP_NAME),
        }

        self.transition(LinkState::PortalOpen);
        let form = PortalForm {
            api_key: existing.api_key.clone(),
            city: existing.city.clone(),
        };

        let submission = match with_timeout(timeout, self.portal.serve(&form)).await {
            Ok(Ok(submission)) => submission,
            Ok(Err(e)) => {
                error!("WiFi portal failed: {}", e);
                self.transition(LinkState::PortalTimeout);
                return ConnectivityOutcome::PortalTimeout;
            }
            Err(_) => {
                warn!("WiFi portal timed out after {}s", timeout.as_secs());
                self.transition(LinkState::PortalTimeout);
                return ConnectivityOutcome::PortalTimeout;
            }
        };

        self.transition(LinkState::PortalAccepted);
        let (revised, persist) = apply_submission(&existing, &submission);

        if persist {
            if let Err(e) = store.save(&revised).await {
                error!("Failed to persist portal settings: {}", e);
            }
        }

        self.transition(LinkState::Connected);
        ConnectivityOutcome::Connected(revised)
    }
}

/// Merge a portal submission into the existing settings.
///
/// Returns the revised settings and whether they must be persisted.
pub fn apply_submission(existing: &Settings, submission: &PortalSubmission) -> (Settings, bool) {
    let api_key = submission.api_key.trim();
    let city = submission.city.trim();

    let mut revised = existing.clone();

    if api_key.is_empty() {
        info!("WiFi portal: API key left empty, keeping stored key (if any)");
    } else {
        revised.api_key = FieldString::from_truncated(api_key);
    }

    revised.city = if !city.is_empty() {
        FieldString::from_truncated(city)
    } else if !existing.city.is_empty() {
        existing.city.clone()
    } else {
        default_city()
    };

    let persist = !api_key.is_empty() || revised.city != existing.city;
    (revised, persist)
}
