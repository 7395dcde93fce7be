//! Shared handles for one CLI invocation.

use std::path::PathBuf;
use std::sync::Arc;

use carecart_client::{
    AdminService, CartEngine, CheckoutSession, ClientConfig, ConsultationBooking, HttpBackend,
    Notifier, SessionContext,
};
use carecart_core::types::Doctor;
use tracing::{debug, info};

use crate::terminal::{ConsoleNotifier, TerminalPaymentWidget};

pub struct App {
    pub config: ClientConfig,
    pub session: SessionContext,
    pub backend: Arc<HttpBackend>,
    notifier: Arc<dyn Notifier>,
}

impl App {
    pub fn load(config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let config = ClientConfig::load(config_path)?;
        debug!(base_url = %config.api.base_url, "Configuration loaded");

        let session = SessionContext::new(config.session_path());
        if session.restore()? {
            info!("Session restored");
        }

        let backend = Arc::new(HttpBackend::new(&config, session.clone())?);
        Ok(App {
            config,
            session,
            backend,
            notifier: Arc::new(ConsoleNotifier),
        })
    }

    pub fn cart(&self) -> Arc<CartEngine<HttpBackend>> {
        Arc::new(
            CartEngine::new(self.backend.clone(), self.session.clone(), &self.config)
                .with_notifier(self.notifier.clone()),
        )
    }

    pub fn checkout(
        &self,
        cart: Arc<CartEngine<HttpBackend>>,
    ) -> CheckoutSession<HttpBackend, TerminalPaymentWidget> {
        CheckoutSession::new(
            self.backend.clone(),
            cart,
            Arc::new(TerminalPaymentWidget),
            self.session.clone(),
            self.config.payment.clone(),
        )
        .with_notifier(self.notifier.clone())
    }

    pub fn booking(
        &self,
        doctor: Doctor,
    ) -> anyhow::Result<ConsultationBooking<HttpBackend, TerminalPaymentWidget>> {
        Ok(ConsultationBooking::new(
            self.backend.clone(),
            Arc::new(TerminalPaymentWidget),
            self.session.clone(),
            &self.config,
            doctor,
        )?
        .with_notifier(self.notifier.clone()))
    }

    pub fn admin(&self) -> AdminService<HttpBackend> {
        AdminService::new(self.backend.clone(), self.session.clone())
            .with_notifier(self.notifier.clone())
    }
}
