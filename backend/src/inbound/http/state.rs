//! Shared HTTP adapter state.
//!
//! Handlers receive this state through `actix_web::web::Data`. It holds the
//! request pipeline plus the domain services the handlers call into, so
//! handlers stay free of I/O wiring and are testable with in-memory adapters.

use crate::domain::{AuthService, OtpService, StockService, UserService};

use super::pipeline::RequestPipeline;

/// Services and the pipeline shared by every handler.
#[derive(Clone)]
pub struct HttpState {
    /// Guard, audit and envelope stages wrapped around each operation.
    pub pipeline: RequestPipeline,
    /// Login, registration and logout.
    pub auth: AuthService,
    /// Account management.
    pub users: UserService,
    /// One-time code flows.
    pub otp: OtpService,
    /// Stocks, subscriptions and alerts.
    pub stocks: StockService,
}

impl HttpState {
    /// Bundle the pipeline with the services behind it.
    pub fn new(
        pipeline: RequestPipeline,
        auth: AuthService,
        otp: OtpService,
        stocks: StockService,
    ) -> Self {
        let users = auth.users().clone();
        Self {
            pipeline,
            auth,
            users,
            otp,
            stocks,
        }
    }
}
